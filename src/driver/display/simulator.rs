// src/driver/display/simulator.rs

//! 文件模拟显示后端
//!
//! 上电时创建（截断）输出文件并写入 PBM 头 `P4 <宽> <高>\n`，
//! 之后每次 `display` 把帧数据原样追加到文件中。

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use super::{DeviceState, DisplayDriver, DisplayResult};
use crate::common::error::DisplayError;

/// PBM 二进制格式标记
pub const PBM_TAG: &str = "P4";

type Opener<W> = Box<dyn FnMut() -> io::Result<W>>;

pub struct SimulatorEpdDriver<W: Write = File> {
    target: String,
    open: Opener<W>,
    sink: Option<W>,
    width: u16,
    height: u16,
    state: DeviceState,
}

impl SimulatorEpdDriver<File> {
    /// 输出到指定路径的 PBM 文件
    pub fn new(path: &Path, width: u16, height: u16) -> Self {
        let path: PathBuf = path.to_path_buf();
        let target = path.display().to_string();
        Self::with_opener(target, width, height, move || File::create(&path))
    }
}

impl<W: Write> SimulatorEpdDriver<W> {
    /// 使用自定义的输出打开方式
    ///
    /// # 参数
    /// - `target`: 用于日志的输出名称
    /// - `open`: 每次上电时调用，返回新的输出
    pub fn with_opener(
        target: impl Into<String>,
        width: u16,
        height: u16,
        open: impl FnMut() -> io::Result<W> + 'static,
    ) -> Self {
        Self {
            target: target.into(),
            open: Box::new(open),
            sink: None,
            width,
            height,
            state: DeviceState::Off,
        }
    }

    /// 当前输出（仅在打开状态下存在）
    pub fn sink(&self) -> Option<&W> {
        self.sink.as_ref()
    }

    /// 单次写入，`Interrupted` 时重试
    fn write_once(sink: &mut W, bytes: &[u8]) -> DisplayResult<()> {
        let written = loop {
            match sink.write(bytes) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if written < bytes.len() {
            error!("Short write to simulator: {} of {} bytes", written, bytes.len());
            return Err(DisplayError::PartialWrite {
                written,
                expected: bytes.len(),
            });
        }
        Ok(())
    }
}

impl<W: Write> DisplayDriver for SimulatorEpdDriver<W> {
    fn power_on(&mut self) -> DisplayResult<()> {
        if self.sink.is_some() {
            warn!("Simulator output {} already open", self.target);
            return Ok(());
        }

        info!("Opening simulator output {}", self.target);
        let mut sink = (self.open)().map_err(|e| {
            error!("Failed to open {}: {}", self.target, e);
            DisplayError::Io(e)
        })?;

        let header = format!("{} {} {}\n", PBM_TAG, self.width, self.height);
        Self::write_once(&mut sink, header.as_bytes())?;

        self.sink = Some(sink);
        self.state = DeviceState::On;
        Ok(())
    }

    fn display(&mut self, bitmap: &[u8]) -> DisplayResult<()> {
        let Some(sink) = self.sink.as_mut() else {
            error!("display() called before power_on()");
            return Err(DisplayError::NotInitialized);
        };

        self.state = DeviceState::Displaying;
        let result = Self::write_once(sink, bitmap).and_then(|_| sink.flush().map_err(Into::into));
        self.state = DeviceState::On;

        result?;
        debug!("Wrote {} bytes to {}", bitmap.len(), self.target);
        Ok(())
    }

    fn reset(&mut self) -> DisplayResult<()> {
        info!("Resetting simulator output {}", self.target);
        if self.sink.is_some() {
            self.power_off()?;
        }
        self.power_on()
    }

    fn power_off(&mut self) -> DisplayResult<()> {
        let Some(mut sink) = self.sink.take() else {
            error!("power_off() called on closed simulator output");
            return Err(DisplayError::Uninitialized);
        };
        self.state = DeviceState::Off;
        sink.flush()?;
        info!("Closed simulator output {}", self.target);
        Ok(())
    }

    fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn state(&self) -> DeviceState {
        self.state
    }
}
