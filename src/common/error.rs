// src/common/error.rs

//! 错误类型定义
//!
//! 每个子系统拥有独立的错误枚举，`AppError` 统一包装后供程序入口使用。

use std::io;

use thiserror::Error;

/// 帧缓冲区错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    #[error("Invalid bitmap dimensions {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },

    #[error("Target ({x}, {y}) with size {width}x{height} exceeds bitmap bounds {bound_w}x{bound_h}")]
    OutOfRange {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        bound_w: u16,
        bound_h: u16,
    },

    #[error("Bitmap has no backing storage")]
    Uninitialized,

    #[error("Bitmap storage length {actual} does not match expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// 底层传输（GPIO/SPI）错误
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("GPIO {pin} error: {message}")]
    Gpio { pin: u8, message: String },

    #[error("SPI error: {0}")]
    Spi(String),

    #[error("Transport resource not opened: {0}")]
    NotOpen(&'static str),
}

/// 显示设备错误
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Display device is not initialized")]
    NotInitialized,

    #[error("Display device was never opened or already closed")]
    Uninitialized,

    #[error("Invalid frame: expected {expected} bytes, got {actual}")]
    InvalidInput { expected: usize, actual: usize },

    #[error("Invalid display dimensions: {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },

    #[error("Partial write: {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    #[error("Busy line still asserted after {polls} polls")]
    Busy { polls: u32 },

    #[error("Transport error: {0}")]
    Comms(#[from] TransportError),

    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Unsupported display backend: {0}")]
    Unsupported(String),
}

/// UTF-8 解码错误
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Input ended inside a {expected}-byte sequence after {read} bytes")]
    Truncated { expected: usize, read: usize },

    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
}

/// 字形栅格化错误
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Invalid font size: {0}")]
    InvalidFontSize(u32),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Font has no glyph for U+{0:04X}")]
    MissingGlyph(u32),

    #[error("Unsupported glyph pixel mode: {0}")]
    UnsupportedPixelMode(String),

    #[error("Negative glyph pitch {0} is not supported")]
    NegativePitch(i32),

    #[error("Glyph bitmap error: {0}")]
    Graphics(#[from] GraphicsError),
}

/// 字形缓存错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid font size: {0}")]
    InvalidFontSize(u32),

    #[error("Glyph U+{0:04X} is already cached")]
    AlreadyCached(u32),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    #[error("Display error: {0}")]
    Display(#[from] DisplayError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Usage: {0}")]
    Usage(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, AppError>;
