// src/graphics/mod.rs

/// 图形模块：帧缓冲区、字形、字形缓存与文字栅格化
pub mod buffer;
pub mod cache;
pub mod glyph;
pub mod pattern;
pub mod text;
