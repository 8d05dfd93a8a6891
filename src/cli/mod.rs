//! 命令行接口模块
//!
//! 提供CLI参数解析、示例配置结构和命令处理功能

pub mod args;
pub mod commands;
pub mod settings;

// 重新导出主要类型
pub use args::Args;
pub use commands::{command_for, Command};
pub use settings::{ServiceSettings, WebSettings};
