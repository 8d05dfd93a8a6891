//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::cli::settings::ServiceSettings;
use crate::config::{ConfigHandle, Params};
use crate::logging::{LogConfig, LoggingSystem};
use crate::schema::{Schema, Shape, TypeDescriptor};
use crate::source::{EnvSource, FileSource, Source};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 根据子命令选择处理器
pub fn command_for(args: &Args) -> Box<dyn Command> {
    match &args.command {
        Commands::Show { .. } => Box::new(ShowCommand),
        Commands::Watch { .. } => Box::new(WatchCommand),
        Commands::Describe { .. } => Box::new(DescribeCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    }
}

/// 按命令行参数构建配置源：文件按出现顺序排列，环境变量优先级最高
///
/// # 参数
/// * `args` - 命令行参数
/// * `watch` - 文件监听的防抖动延迟，`None` 表示不监听
pub fn build_sources(
    args: &Args,
    watch: Option<Duration>,
) -> Result<Vec<Box<dyn Source<ServiceSettings>>>> {
    let mut sources: Vec<Box<dyn Source<ServiceSettings>>> = Vec::new();

    for path in &args.files {
        let mut source = FileSource::<ServiceSettings>::from_path(path)
            .with_context(|| format!("无法识别配置文件格式: {}", path.display()))?
            .with_env_substitution(args.substitute_env);
        if let Some(debounce) = watch {
            source = source.watched(debounce);
        }
        sources.push(Box::new(source));
    }

    if let Some(prefix) = &args.env_prefix {
        sources.push(Box::new(EnvSource::<ServiceSettings>::with_prefix(prefix)));
    }

    Ok(sources)
}

fn render<T: Serialize>(value: &T, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Toml => toml::to_string_pretty(value).context("序列化为TOML失败"),
        _ => serde_json::to_string_pretty(value).context("序列化为JSON失败"),
    }
}

/// 合成并输出配置快照
pub struct ShowCommand;

#[async_trait]
impl Command for ShowCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Show { format } = &args.command else {
            return Ok(());
        };

        let token = CancellationToken::new();
        let handle = ConfigHandle::new(
            &token,
            ServiceSettings::default(),
            build_sources(args, None)?,
        )
        .await
        .context("构建配置快照失败")?;

        println!("{}", render(handle.view().as_ref(), format)?);
        Ok(())
    }
}

/// 监听配置变更
pub struct WatchCommand;

#[async_trait]
impl Command for WatchCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Watch { debounce_ms } = &args.command else {
            return Ok(());
        };

        let logging = watch_logging(args);
        let type_name = ServiceSettings::descriptor().name;

        let error_logging = logging.clone();
        let params = Params::default().on_watched_error(
            move |error, _current: &ServiceSettings, candidate: Option<&ServiceSettings>| {
                error_logging.watch_error_log(
                    type_name,
                    &error.to_string(),
                    candidate.is_some(),
                );
            },
        );

        let token = CancellationToken::new();
        let mut handle = ConfigHandle::with_params(
            &token,
            ServiceSettings::default(),
            params,
            build_sources(args, Some(Duration::from_millis(*debounce_ms)))?,
        )
        .await
        .context("构建配置快照失败")?;

        if !handle.is_watching() {
            warn!("没有可监听的配置源，输出当前快照后退出");
        }

        let mut events = handle.events();
        print_snapshot(handle.version(), events.borrow_and_update().as_ref())?;
        logging.snapshot_log(type_name, handle.version(), None);

        info!("开始监听配置变更，按 Ctrl+C 退出");
        while handle.is_watching() {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("收到退出信号");
                    break;
                }
                changed = events.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = events.borrow_and_update().clone();
                    print_snapshot(handle.version(), snapshot.as_ref())?;
                    logging.snapshot_log(type_name, handle.version(), None);
                }
            }
        }

        handle.shutdown().await;
        Ok(())
    }
}

/// 监听命令使用的日志输出，沿用命令行的日志格式
fn watch_logging(args: &Args) -> LoggingSystem {
    LoggingSystem::new(LogConfig {
        level: args.log_level.clone().into(),
        file_path: args.log_file.clone(),
        console: true,
        json_format: args.json_logs,
    })
}

fn print_snapshot(version: u64, settings: &ServiceSettings) -> Result<()> {
    println!(
        "# {} 版本 {}",
        chrono::Local::now().to_rfc3339(),
        version
    );
    println!("{}", render(settings, &OutputFormat::Json)?);
    Ok(())
}

/// 输出配置结构描述
pub struct DescribeCommand;

/// 叶子字段描述
#[derive(Debug, Serialize)]
struct LeafEntry {
    path: String,
    type_name: &'static str,
    optional_type_name: &'static str,
    env_var: Option<String>,
}

fn leaf_entries(
    descriptor: &TypeDescriptor,
    env: Option<&EnvSource<ServiceSettings>>,
) -> Vec<LeafEntry> {
    descriptor
        .leaf_paths()
        .into_iter()
        .filter_map(|path| {
            let Some(Shape::Leaf {
                type_name,
                optional_type_name,
            }) = descriptor.lookup(&path).map(|field| &field.shape)
            else {
                return None;
            };
            Some(LeafEntry {
                path: path.join("."),
                type_name: *type_name,
                optional_type_name: *optional_type_name,
                env_var: env.map(|env| env.variable_name(&path)),
            })
        })
        .collect()
}

#[async_trait]
impl Command for DescribeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Describe { format } = &args.command else {
            return Ok(());
        };

        let descriptor = ServiceSettings::descriptor();
        let env = args
            .env_prefix
            .as_ref()
            .map(|prefix| EnvSource::<ServiceSettings>::with_prefix(prefix.as_str()));
        let entries = leaf_entries(&descriptor, env.as_ref());

        match format {
            OutputFormat::Text => {
                println!("{descriptor}");
                for entry in &entries {
                    match &entry.env_var {
                        Some(env_var) => println!("{} <- {}", entry.path, env_var),
                        None => println!("{}", entry.path),
                    }
                }
            }
            _ => {
                #[derive(Serialize)]
                struct Description<'a> {
                    name: &'static str,
                    fields: &'a [LeafEntry],
                }
                let description = Description {
                    name: descriptor.name,
                    fields: &entries,
                };
                println!("{}", render(&description, format)?);
            }
        }
        Ok(())
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Toml => {
                    println!("name = \"{}\"", crate::APP_NAME);
                    println!("version = \"{}\"", crate::VERSION);
                    println!("description = \"{}\"", crate::APP_DESCRIPTION);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}
