//! 墨水屏阅读程序主入口
//!
//! 用法：
//! - `epd_reader <文本文件> <字号> [字体文件]`：排版并显示一页文本
//! - `epd_reader --pattern`：显示诊断图案

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};

use epd_reader::app::reader;
use epd_reader::driver::display::create_display_driver;
use epd_reader::graphics::text::{create_rasterizer, font_name};
use epd_reader::{AppConfig, AppError, Result};

const USAGE: &str = "epd_reader <textfile> <fontsize> [fontpath] | epd_reader --pattern";

enum Mode {
    Text { path: PathBuf },
    Pattern,
}

/// 解析命令行，命令行参数覆盖配置文件中的字体设置
fn parse_args(args: &[String], config: &mut AppConfig) -> Result<Mode> {
    match args {
        [flag] if flag == "--pattern" => Ok(Mode::Pattern),
        [path, size, rest @ ..] if rest.len() <= 1 => {
            let size: u32 = size
                .parse()
                .map_err(|_| AppError::Usage(format!("invalid font size '{}'", size)))?;
            if size == 0 {
                return Err(AppError::Usage("font size must be positive".into()));
            }
            config.font.size = size;
            if let Some(font) = rest.first() {
                config.font.path = Some(PathBuf::from(font));
            }
            Ok(Mode::Text {
                path: PathBuf::from(path),
            })
        }
        _ => Err(AppError::Usage(USAGE.into())),
    }
}

fn run(mode: Mode, config: &AppConfig) -> Result<()> {
    let mut driver = create_display_driver(config)?;

    match mode {
        Mode::Pattern => reader::show_pattern(driver.as_mut()),
        Mode::Text { path } => {
            info!("Reading {}", path.display());
            let file = File::open(&path).map_err(|e| {
                error!("Failed to open {}: {}", path.display(), e);
                AppError::Io(e)
            })?;
            let mut rasterizer = create_rasterizer(&config.font)?;
            let stats = reader::show_text(
                driver.as_mut(),
                rasterizer.as_mut(),
                &font_name(&config.font),
                config.font.size,
                BufReader::new(file),
                config.layout,
            )?;
            info!("Displayed {} glyphs on {} lines", stats.placed, stats.lines);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    // 初始化日志
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("墨水屏阅读程序启动");

    let mut config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match parse_args(&args, &mut config) {
        Ok(mode) => mode,
        Err(e) => {
            error!("{}", e);
            eprintln!("usage: {}", USAGE);
            return ExitCode::from(2);
        }
    };

    match run(mode, &config) {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
