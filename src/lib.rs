// src/lib.rs

//! 电子墨水屏文本阅读器
//!
//! 把 UTF-8 文本栅格化、排版到 1bpp 帧缓冲区，再通过显示驱动输出到
//! PBM 模拟文件或 Waveshare 2.9 寸黑白屏。

pub mod app;
pub mod common;
pub mod driver;
pub mod graphics;
pub mod hal;
pub mod text;

pub use common::config::AppConfig;
pub use common::error::{AppError, Result};
