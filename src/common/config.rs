// src/common/config.rs

//! 运行配置
//!
//! 默认值对应 2.9 寸黑白墨水屏（128x296）接在树莓派 SPI0 上的接法。
//! 可通过环境变量 `EPD_READER_CONFIG` 指定 JSON 配置文件覆盖其中任意字段。

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::common::error::{AppError, Result};

/// 指定配置文件路径的环境变量
pub const CONFIG_ENV: &str = "EPD_READER_CONFIG";

/// 显示后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// 写入 PBM 文件的模拟器
    #[default]
    Simulator,
    /// Waveshare 2.9 寸黑白屏
    Ws29bw,
}

/// 设备上黑色像素对应的电平
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlackLevel {
    /// 0 表示黑色，输出时按位取反
    #[default]
    Low,
    /// 1 表示黑色，原样输出
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub width: u16,
    pub height: u16,
    /// 模拟器输出文件
    pub output: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 296,
            output: PathBuf::from("./display.pbm"),
        }
    }
}

/// 硬件接线与时序
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub rst_pin: u8,
    pub dc_pin: u8,
    pub cs_pin: u8,
    pub busy_pin: u8,
    pub spi_channel: u8,
    pub spi_clock_hz: u32,
    pub reset_delay_ms: u32,
    pub busy_delay_ms: u32,
    pub busy_poll_limit: u32,
    pub black: BlackLevel,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            rst_pin: 17,
            dc_pin: 25,
            cs_pin: 8,
            busy_pin: 24,
            spi_channel: 0,
            spi_clock_hz: 32_000_000,
            reset_delay_ms: 200,
            busy_delay_ms: 300,
            busy_poll_limit: 100,
            black: BlackLevel::Low,
        }
    }
}

/// 排版参数（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub margin: u16,
    pub line_spacing: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: 4,
            line_spacing: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// 字体文件；为空时使用内置点阵字体
    pub path: Option<PathBuf>,
    /// 像素高度
    pub size: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: None,
            size: 16,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: Backend,
    pub device: DeviceConfig,
    pub hardware: HardwareConfig,
    pub layout: LayoutConfig,
    pub font: FontConfig,
}

impl AppConfig {
    /// 从 JSON 字符串解析配置，未出现的字段取默认值
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 读取 JSON 配置文件
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            log::error!("Failed to read config {}: {}", path.display(), e);
            AppError::Config(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// 按环境变量加载配置，未设置时返回默认配置
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            None => {
                debug!("{} not set, using default configuration", CONFIG_ENV);
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.device.width == 0 || self.device.height == 0 {
            return Err(AppError::Config(format!(
                "device dimensions must be non-zero, got {}x{}",
                self.device.width, self.device.height
            )));
        }
        if self.font.size == 0 {
            return Err(AppError::Config("font size must be non-zero".into()));
        }
        if self.hardware.busy_poll_limit == 0 {
            return Err(AppError::Config("busy_poll_limit must be non-zero".into()));
        }
        Ok(())
    }
}
