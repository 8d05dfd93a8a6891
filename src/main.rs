//! Strata 主程序入口
//!
//! 合成、监听并输出分层配置快照

use anyhow::{Context, Result};
use clap::Parser;
use strata::cli::{command_for, Args};
use strata::logging::{LogConfig, LoggingSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig {
        level: args.log_level.clone().into(),
        file_path: args.log_file.clone(),
        console: true,
        json_format: args.json_logs,
    };

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Strata v{} 启动", strata::VERSION);

    // 执行命令
    if let Err(e) = command_for(&args).execute(&args).await {
        error!("命令执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
