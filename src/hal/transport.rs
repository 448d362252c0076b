// src/hal/transport.rs

//! GPIO/SPI 传输接口

pub use embedded_hal::digital::PinState;

use crate::common::error::TransportError;

/// 引脚方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// 显示驱动所需的底层总线操作
///
/// 引脚编号为 BCM 编号；SPI 通道为 `/dev/spidev0.<channel>`。
pub trait Transport {
    /// 设置引脚方向，同一引脚可重复设置
    fn gpio_set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), TransportError>;

    /// 输出电平，引脚须先设为输出
    fn gpio_write(&mut self, pin: u8, level: PinState) -> Result<(), TransportError>;

    /// 读取电平
    fn gpio_read(&mut self, pin: u8) -> Result<PinState, TransportError>;

    /// 打开 SPI 通道
    fn spi_open(&mut self, channel: u8, speed_hz: u32) -> Result<(), TransportError>;

    /// 写出字节
    ///
    /// # 返回值
    /// - `Result<usize>`: 实际写出的字节数，可能少于 `bytes.len()`
    fn spi_write(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// 毫秒级延时
    fn delay_ms(&mut self, ms: u32);
}
