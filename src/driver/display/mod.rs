// src/driver/display/mod.rs

/// 电子墨水屏驱动模块
///
/// 本模块定义了电子墨水屏（EPD）驱动的通用接口和两种后端：
/// 写 PBM 文件的模拟器，以及通过 GPIO/SPI 驱动的 Waveshare 2.9 寸黑白屏。
use log::info;

use crate::common::config::{AppConfig, Backend};
use crate::common::error::{DisplayError, Result};

pub mod command;
pub mod simulator;
pub mod ws29bw;

pub use simulator::SimulatorEpdDriver;
pub use ws29bw::Ws29BwDriver;

pub type DisplayResult<T> = core::result::Result<T, DisplayError>;

/// 设备状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Off,
    On,
    /// 正在传输/刷新一帧
    Displaying,
}

/// 电子墨水屏驱动trait
///
/// 定义电子墨水屏设备的通用操作接口。状态转换：
/// `Off --power_on--> On --display--> On --power_off--> Off`，
/// `display` 只能在 `On` 状态下调用。
pub trait DisplayDriver {
    /// 打开设备
    ///
    /// 初始化底层资源并完成上电序列
    ///
    /// # 返回值
    /// - `DisplayResult<()>`: 失败时设备保持关闭
    fn power_on(&mut self) -> DisplayResult<()>;

    /// 显示一帧
    ///
    /// # 参数
    /// - `bitmap`: 1bpp、MSB 在前、1 为黑的帧数据
    ///
    /// # 返回值
    /// - `DisplayResult<()>`: 未打开时返回 `NotInitialized`
    fn display(&mut self, bitmap: &[u8]) -> DisplayResult<()>;

    /// 复位设备
    fn reset(&mut self) -> DisplayResult<()>;

    /// 关闭设备并释放资源
    fn power_off(&mut self) -> DisplayResult<()>;

    /// 设备分辨率 `(宽, 高)`
    fn dimensions(&self) -> (u16, u16);

    fn state(&self) -> DeviceState;
}

/// 根据配置创建显示驱动
///
/// # 参数
/// - `config`: 运行配置，`backend` 字段决定后端
///
/// # 返回值
/// - `Result<Box<dyn DisplayDriver>>`: 未编译进来的后端返回 `Unsupported`
pub fn create_display_driver(config: &AppConfig) -> Result<Box<dyn DisplayDriver>> {
    let (width, height) = (config.device.width, config.device.height);
    match config.backend {
        Backend::Simulator => {
            info!(
                "Using simulator backend writing {}",
                config.device.output.display()
            );
            Ok(Box::new(SimulatorEpdDriver::new(
                &config.device.output,
                width,
                height,
            )))
        }
        #[cfg(feature = "tspi")]
        Backend::Ws29bw => {
            info!("Using Waveshare 2.9\" B/W backend");
            let transport = crate::hal::linux::LinuxTransport::new();
            Ok(Box::new(Ws29BwDriver::new(
                transport,
                config.hardware.clone(),
                width,
                height,
            )?))
        }
        #[cfg(not(feature = "tspi"))]
        Backend::Ws29bw => {
            log::error!("ws29bw backend requested but built without the `tspi` feature");
            Err(DisplayError::Unsupported("ws29bw (enable the `tspi` feature)".into()).into())
        }
    }
}
