// src/app/mod.rs

/// 应用层：文本阅读流程
pub mod reader;
