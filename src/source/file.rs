//! 文件配置源
//!
//! 读取配置文件、替换 `${VAR}` 形式的环境变量并解码；可选地监控文件变更并热重载

use crate::error::SourceError;
use crate::schema::{Schema, Type};
use crate::source::decoder::{decode_with, decoder_for_path, Decoder};
use crate::source::{Deliverer, Source, Watcher};
use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 文件配置源
pub struct FileSource<T: Schema> {
    /// 配置文件路径
    path: PathBuf,
    /// 配置源名称
    name: String,
    /// 解码器
    decoder: Arc<dyn Decoder<T>>,
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
    /// 防抖动延迟，`None` 表示不监控
    debounce_delay: Option<Duration>,
}

impl<T: Schema> FileSource<T> {
    /// 创建文件配置源
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    /// * `decoder` - 解码器
    pub fn new<P: AsRef<Path>>(path: P, decoder: impl Decoder<T> + 'static) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("file:{}", path.display()),
            path,
            decoder: Arc::new(decoder),
            enable_env_substitution: false,
            debounce_delay: None,
        }
    }

    /// 按扩展名（`.toml` / `.json`）选择解码器创建文件配置源
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let name = format!("file:{}", path.display());
        let decoder = decoder_for_path::<T>(&path)
            .ok_or_else(|| SourceError::read(&name, "无法根据扩展名确定配置文件格式"))?;
        Ok(Self {
            name,
            path,
            decoder: Arc::from(decoder),
            enable_env_substitution: false,
            debounce_delay: None,
        })
    }

    /// 启用 `${VAR}` 环境变量替换
    pub fn with_env_substitution(mut self, enabled: bool) -> Self {
        self.enable_env_substitution = enabled;
        self
    }

    /// 启用文件监控
    ///
    /// # 参数
    /// * `debounce_delay` - 防抖动延迟，连续的写入事件只触发一次重载
    pub fn watched(mut self, debounce_delay: Duration) -> Self {
        self.debounce_delay = Some(debounce_delay);
        self
    }

    /// 配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn loader(&self) -> FileLoader<T> {
        FileLoader {
            path: self.path.clone(),
            name: self.name.clone(),
            decoder: Arc::clone(&self.decoder),
            enable_env_substitution: self.enable_env_substitution,
        }
    }
}

/// 读取、替换并解码配置文件；监控任务持有一份独立副本
struct FileLoader<T: Schema> {
    path: PathBuf,
    name: String,
    decoder: Arc<dyn Decoder<T>>,
    enable_env_substitution: bool,
}

impl<T: Schema> FileLoader<T> {
    async fn load(&self, ty: &Type<T>) -> Result<T::Partial, SourceError> {
        // 检查文件是否存在
        if !self.path.exists() {
            return Err(SourceError::read(
                &self.name,
                format!("配置文件不存在: {}", self.path.display()),
            ));
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::read(&self.name, format!("读取文件失败: {e}")))?;

        let content = if self.enable_env_substitution {
            substitute_env_vars(&content).map_err(|reason| SourceError::read(&self.name, reason))?
        } else {
            content
        };

        let partial = decode_with(self.decoder.as_ref(), &self.name, &content, ty)?;
        debug!("成功加载配置文件: {}", self.path.display());
        Ok(partial)
    }
}

/// 替换字符串中 `${VAR_NAME}` 形式的环境变量
///
/// # 返回
/// * `Result<String, String>` - 替换后的字符串，变量不存在时返回错误
pub fn substitute_env_vars(content: &str) -> Result<String, String> {
    static ENV_VAR_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let env_var_regex = ENV_VAR_REGEX
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}"))
        .as_ref()
        .map_err(|e| format!("正则表达式错误: {e}"))?;

    let mut result = String::with_capacity(content.len());
    let mut last_end = 0;
    for captures in env_var_regex.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = std::env::var(var_name.as_str())
            .map_err(|_| format!("环境变量替换失败: {}", var_name.as_str()))?;
        result.push_str(&content[last_end..full_match.start()]);
        result.push_str(&value);
        last_end = full_match.end();
    }
    result.push_str(&content[last_end..]);
    Ok(result)
}

/// 检查是否是目标文件的写入或创建事件
fn is_target_file_event(event: &Event, target_path: &Path) -> bool {
    match &event.kind {
        EventKind::Modify(_) | EventKind::Create(_) => event
            .paths
            .iter()
            .any(|path| path == target_path || path.file_name() == target_path.file_name()),
        _ => false,
    }
}

#[async_trait]
impl<T: Schema> Source<T> for FileSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn value(&self, ty: &Type<T>) -> Result<T::Partial, SourceError> {
        self.loader().load(ty).await
    }

    fn watcher(&self) -> Option<&dyn Watcher<T>> {
        if self.debounce_delay.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl<T: Schema> Watcher<T> for FileSource<T> {
    async fn watch(
        &self,
        token: CancellationToken,
        ty: &Type<T>,
        deliver: Deliverer<T>,
    ) -> Result<(), SourceError> {
        let debounce_delay = self.debounce_delay.unwrap_or(Duration::from_millis(100));
        info!("启动配置文件监控: {}", self.path.display());

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            notify::Config::default().with_poll_interval(Duration::from_secs(1)),
        )
        .map_err(|e| SourceError::watch(&self.name, format!("创建文件监控器失败: {e}")))?;

        // 监控配置文件所在目录，编辑器常以替换文件的方式保存
        let watch_path = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        watcher
            .watch(watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                SourceError::watch(
                    &self.name,
                    format!("监控目录失败: {}: {e}", watch_path.display()),
                )
            })?;

        let task = FileWatchTask {
            loader: self.loader(),
            ty: ty.clone(),
            debounce_delay,
            _watcher: watcher,
        };
        tokio::spawn(task.run(rx, token, deliver));

        Ok(())
    }
}

/// 文件监控任务，持有文件系统监控器直到结束
struct FileWatchTask<T: Schema> {
    loader: FileLoader<T>,
    ty: Type<T>,
    debounce_delay: Duration,
    _watcher: RecommendedWatcher,
}

impl<T: Schema> FileWatchTask<T> {
    async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
        token: CancellationToken,
        deliver: Deliverer<T>,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                Ok(event) => {
                    if !is_target_file_event(&event, &self.loader.path) {
                        continue;
                    }
                    debug!("检测到配置文件变更事件: {:?}", event);
                }
                Err(e) => {
                    error!("文件监控事件错误: {}", e);
                    continue;
                }
            }

            // 等待写入完成，并合并防抖动窗口内的后续事件
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.debounce_delay) => {}
            }
            while rx.try_recv().is_ok() {}

            let delivered = match self.loader.load(&self.ty).await {
                Ok(partial) => {
                    info!("配置文件重载成功: {}", self.loader.path.display());
                    deliver.deliver(partial).await
                }
                Err(e) => {
                    warn!("配置文件重载失败: {}", e);
                    deliver.report(e).await
                }
            };
            if !delivered {
                break;
            }
        }
        info!("配置文件监控已停止: {}", self.loader.path.display());
    }
}
