//! 日志系统模块
//!
//! 提供结构化日志配置和管理功能

use log::LevelFilter;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化结果
    init_result: Result<(), String>,
}

impl Default for GlobalLoggingState {
    fn default() -> Self {
        Self {
            initialized: false,
            init_result: Ok(()),
        }
    }
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

fn lock_state(state: &Mutex<GlobalLoggingState>) -> MutexGuard<'_, GlobalLoggingState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（可选），与控制台输出可同时启用
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台（标准错误）
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// 以级别名称创建日志配置
    ///
    /// # 参数
    /// * `level` - 级别名称，如 `info`、`debug`
    ///
    /// # 返回
    /// * `anyhow::Result<LogConfig>` - 无法识别的级别名称返回错误
    pub fn with_level(level: &str) -> anyhow::Result<Self> {
        let level = level
            .parse::<LevelFilter>()
            .map_err(|_| anyhow::anyhow!("无效的日志级别: {}", level))?;
        Ok(Self {
            level,
            ..Self::default()
        })
    }
}

/// 日志系统管理器
#[derive(Debug, Clone)]
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 创建新的日志系统
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    /// 初始化日志系统
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `Result<LoggingSystem, anyhow::Error>` - 初始化结果
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 初始化日志系统（带选项）
    ///
    /// # 参数
    /// * `config` - 日志配置
    /// * `force_reinit` - 是否强制重新初始化（主要用于测试）
    ///
    /// # 返回
    /// * `Result<LoggingSystem, anyhow::Error>` - 初始化结果
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        let state_mutex =
            GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));

        {
            let state = lock_state(state_mutex);
            if state.initialized && !force_reinit {
                // 已经初始化过，沿用之前的结果
                return match &state.init_result {
                    Ok(()) => Ok(Self::new(config)),
                    Err(e) => Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e)),
                };
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = lock_state(state_mutex);
            state.initialized = true;
            state.init_result = init_result.as_ref().map(|_| ()).map_err(|e| e.to_string());
        }

        init_result?;
        Ok(Self::new(config))
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        // 初始化 LogTracer（log crate 到 tracing 的桥接）
        Self::init_log_tracer()?;

        Self::init_tracing_subscriber(config)?;

        Ok(())
    }

    /// 初始化 LogTracer
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 构建环境过滤器，模块级别由 `RUST_LOG` 控制
    fn build_env_filter(config: &LogConfig) -> anyhow::Result<EnvFilter> {
        Ok(EnvFilter::from_default_env()
            .add_directive(Self::level_to_string(config.level).parse()?))
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let env_filter = Self::build_env_filter(config)?;

        let console_layer = config.console.then(|| {
            if config.json_format {
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_file(true)
                    .with_line_number(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339())
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_names(true)
                    .boxed()
            }
        });

        let file_layer = match &config.file_path {
            Some(file_path) => {
                let file = std::fs::File::create(file_path)
                    .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
                Some(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_timer(fmt::time::ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_file(true)
                        .with_line_number(true),
                )
            }
            None => None,
        };

        let result = registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init();

        match result {
            Ok(()) => {
                tracing::info!("日志系统初始化完成");
                tracing::debug!("日志配置: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains(
                    "attempted to set a logger after the logging system was already initialized",
                ) || error_msg.contains("a global default trace dispatcher has already been set")
                {
                    // 已有全局订阅者，例如同一进程中的其他测试
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "tracing subscriber初始化失败: {}",
                        error_msg
                    ))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为字符串
    fn level_to_string(level: LevelFilter) -> &'static str {
        match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state_mutex) = GLOBAL_LOGGING_STATE.get() {
            let mut state = lock_state(state_mutex);
            state.initialized = false;
            state.init_result = Ok(());
        }
    }

    /// 记录配置快照发布日志
    ///
    /// # 参数
    /// * `type_name` - 配置类型名称
    /// * `version` - 快照版本号
    /// * `details` - 附加信息
    pub fn snapshot_log(&self, type_name: &str, version: u64, details: Option<&str>) {
        let snapshot_entry = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "type": "snapshot",
            "config_type": type_name,
            "version": version,
            "details": details.unwrap_or(""),
        });

        if self.config.json_format {
            tracing::info!("{snapshot_entry}");
        } else {
            tracing::info!(
                "SNAPSHOT: {} v{} {}",
                type_name,
                version,
                details.unwrap_or("")
            );
        }
    }

    /// 记录监听错误日志
    pub fn watch_error_log(&self, type_name: &str, error: &str, rejected: bool) {
        let error_entry = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "type": "watch_error",
            "config_type": type_name,
            "error": error,
            "rejected_candidate": rejected,
        });

        if self.config.json_format {
            tracing::warn!("{error_entry}");
        } else {
            tracing::warn!(
                "WATCH ERROR: {} - {}{}",
                type_name,
                error,
                if rejected { " (候选配置已拒绝)" } else { "" }
            );
        }
    }

    /// 当前日志配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    /// 创建测试用的日志配置
    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
        }
    }

    fn is_initialized() -> bool {
        GLOBAL_LOGGING_STATE
            .get()
            .is_some_and(|state_mutex| lock_state(state_mutex).initialized)
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        // 第一次初始化应该成功
        let result1 = LoggingSystem::setup_logging(config.clone());
        assert!(result1.is_ok());
        assert!(is_initialized());

        // 第二次初始化沿用之前的结果，不会重复初始化
        let result2 = LoggingSystem::setup_logging(config);
        assert!(result2.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_force_reinit() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        let _system = LoggingSystem::setup_logging(config.clone()).unwrap();
        assert!(is_initialized());

        // 强制重新初始化
        let result = LoggingSystem::setup_logging_with_options(config, true);
        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_file.path().to_path_buf());
        config.console = false;

        let result = LoggingSystem::setup_logging(config);
        assert!(result.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_json_format() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config.json_format = true;

        let system = LoggingSystem::setup_logging(config).unwrap();
        assert!(system.config().json_format);
        system.snapshot_log("ServiceSettings", 2, Some("file:config.toml"));
        system.watch_error_log("ServiceSettings", "校验失败", true);
    }

    #[test]
    #[serial]
    fn test_logging_system_with_console_and_file() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_file.path().to_path_buf());

        let system = LoggingSystem::setup_logging_with_options(config, true).unwrap();
        assert!(system.config().console);
        assert!(system.config().file_path.is_some());
        assert!(is_initialized());
    }

    #[test]
    fn test_log_config_with_level() {
        let config = LogConfig::with_level("debug").unwrap();
        assert_eq!(config.level, LevelFilter::Debug);
        assert!(config.console);

        assert!(LogConfig::with_level("verbose").is_err());
    }
}
