// src/text/mod.rs

/// 文本输入处理
pub mod utf8;
