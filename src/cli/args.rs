//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Strata - 分层配置合成与热更新工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "strata",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径，可重复指定，越靠后优先级越高
    #[arg(
        short,
        long = "file",
        value_name = "FILE",
        help = "配置文件路径（.toml 或 .json），可重复指定，越靠后优先级越高",
        env = "STRATA_CONFIG",
        value_delimiter = ','
    )]
    pub files: Vec<PathBuf>,

    /// 环境变量前缀
    #[arg(
        short,
        long,
        value_name = "PREFIX",
        help = "环境变量前缀，设置后环境变量作为最高优先级的配置源",
        env = "STRATA_ENV_PREFIX"
    )]
    pub env_prefix: Option<String>,

    /// 是否替换配置文件中的 `${VAR}`
    #[arg(long, help = "替换配置文件中的 ${VAR} 环境变量引用")]
    pub substitute_env: bool,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        help = "日志级别",
        env = "STRATA_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 是否使用JSON格式输出日志
    #[arg(long, help = "使用JSON格式输出日志")]
    pub json_logs: bool,

    /// 日志文件路径
    #[arg(
        long,
        value_name = "PATH",
        help = "同时把日志写入该文件",
        env = "STRATA_LOG_FILE"
    )]
    pub log_file: Option<PathBuf>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 合成并输出配置快照
    Show {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "json", help = "输出格式")]
        format: OutputFormat,
    },

    /// 监听配置文件并在每次更新后输出新快照
    Watch {
        /// 防抖动延迟（毫秒）
        #[arg(
            short,
            long,
            value_name = "MILLISECONDS",
            default_value = "500",
            help = "防抖动延迟（毫秒）"
        )]
        debounce_ms: u64,
    },

    /// 输出配置结构描述及对应的环境变量名
    Describe {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
    /// TOML格式
    Toml,
}
