//! 配置句柄模块
//!
//! 提供配置快照的构建、监听和热更新功能

pub mod manager;
mod monitor;

// 重新导出主要类型
pub use manager::{ConfigHandle, Params, WatchedErrorHandler};
