// src/common/mod.rs

/// 公共模块定义
///
/// 包含运行配置与各层错误类型
pub mod config;
pub mod error;
