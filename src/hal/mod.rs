// src/hal/mod.rs

//! 硬件抽象层
//!
//! 显示驱动只通过 [`transport::Transport`] 访问 GPIO、SPI 和延时，
//! 具体实现按平台提供。

pub mod transport;

#[cfg(feature = "tspi")]
pub mod linux;

#[cfg(test)]
pub mod mock;
