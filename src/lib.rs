//! Strata - 分层配置合成与热更新引擎
//!
//! 从多个按优先级排列的配置源构建强类型、不可变的配置快照：
//! - 逐字段覆盖合成，区分“未设置”与“显式零值”
//! - 静态、环境变量、文件与手动推送等配置源
//! - 配置源变更后自动重新合成、校验并原子发布
//! - 结构化日志记录

#[macro_use]
pub mod schema;

pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod logging;
pub mod source;

// 重新导出主要类型
pub use compose::{compose, SourceId, SourceValue};
pub use config::{ConfigHandle, Params, WatchedErrorHandler};
pub use error::{
    FieldError, FieldErrorKind, MergeError, SourceError, StrataError, TypeError,
    VerificationError,
};
pub use schema::{Overlay, Schema, Type, TypeDescriptor, Verify};
pub use source::{Deliverer, Source, WatchEvent, Watcher};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
