//! 配置句柄模块
//!
//! 从有序的配置源构建强类型配置快照，并在配置源变更时保持快照最新

use crate::compose::{compose, SourceId, SourceValue};
use crate::config::monitor::Monitor;
use crate::error::{Result, SourceError, StrataError, TypeError, VerificationError};
use crate::schema::{Schema, Type, TypeDescriptor};
use crate::source::{Deliverer, Source};
use arc_swap::ArcSwap;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// 监听期间的错误回调
///
/// 参数依次为：错误、当前快照、被拒绝的候选快照（仅校验失败时提供）。
/// 只在监控任务中调用，不会并发执行。
pub type WatchedErrorHandler<T> = Arc<dyn Fn(&StrataError, &T, Option<&T>) + Send + Sync>;

/// 配置句柄参数
pub struct Params<T: Schema> {
    on_watched_error: Option<WatchedErrorHandler<T>>,
    delivery_capacity: usize,
}

impl<T: Schema> Params<T> {
    /// 默认参数：无错误回调、投递通道容量为 1
    pub fn new() -> Self {
        Self {
            on_watched_error: None,
            delivery_capacity: 1,
        }
    }

    /// 设置监听期间的错误回调
    pub fn on_watched_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&StrataError, &T, Option<&T>) + Send + Sync + 'static,
    {
        self.on_watched_error = Some(Arc::new(handler));
        self
    }

    /// 设置投递通道容量，最小为 1
    pub fn delivery_capacity(mut self, capacity: usize) -> Self {
        self.delivery_capacity = capacity.max(1);
        self
    }
}

impl<T: Schema> Default for Params<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Schema> Clone for Params<T> {
    fn clone(&self) -> Self {
        Self {
            on_watched_error: self.on_watched_error.clone(),
            delivery_capacity: self.delivery_capacity,
        }
    }
}

impl<T: Schema> fmt::Debug for Params<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Params")
            .field("on_watched_error", &self.on_watched_error.is_some())
            .field("delivery_capacity", &self.delivery_capacity)
            .finish()
    }
}

/// 配置句柄
///
/// 持有当前快照与更新通知通道。存在可监听的配置源时，后台监控任务会在配置源
/// 变更后重新合成、校验并原子地发布新快照。句柄被丢弃时停止所有监听。
pub struct ConfigHandle<T: Schema> {
    /// 配置类型描述
    ty: Type<T>,
    /// 当前快照
    current: Arc<ArcSwap<T>>,
    /// 快照更新通知，只保留最新值
    updates: watch::Receiver<Arc<T>>,
    /// 已发布快照的版本号，初始快照为 1
    version: Arc<AtomicU64>,
    /// 监控任务
    monitor: Option<JoinHandle<()>>,
    /// 本句柄的取消令牌
    token: CancellationToken,
}

impl<T: Schema> ConfigHandle<T> {
    /// 以默认参数创建配置句柄
    ///
    /// # 参数
    /// * `token` - 父级取消令牌，取消后监听随之停止
    /// * `base` - 合成的基础实例，每次合成都从它的副本开始
    /// * `sources` - 按优先级升序排列的配置源
    pub async fn new(
        token: &CancellationToken,
        base: T,
        sources: Vec<Box<dyn Source<T>>>,
    ) -> Result<Self> {
        Self::with_params(token, base, Params::default(), sources).await
    }

    /// 创建配置句柄
    ///
    /// 依次读取每个配置源并注册监听，合成初始快照后调用配置类型的校验。
    /// 任一步骤失败都会取消已注册的监听并返回错误。
    ///
    /// # 参数
    /// * `token` - 父级取消令牌
    /// * `base` - 合成的基础实例
    /// * `params` - 句柄参数
    /// * `sources` - 按优先级升序排列的配置源
    ///
    /// # 返回
    /// * `Result<Self>` - 配置句柄
    pub async fn with_params(
        token: &CancellationToken,
        base: T,
        params: Params<T>,
        sources: Vec<Box<dyn Source<T>>>,
    ) -> Result<Self> {
        let token = token.child_token();
        let ty = Type::<T>::new();
        info!(
            "创建配置句柄: {}，配置源数量: {}",
            ty.type_name(),
            sources.len()
        );

        let (tx, rx) = mpsc::channel(params.delivery_capacity);
        let collected = collect_sources(&sources, &ty, &tx, &token).await;
        drop(tx);

        let (values, watching) = match collected {
            Ok(collected) => collected,
            Err(e) => {
                error!("读取配置源失败: {}", e);
                token.cancel();
                return Err(e.into());
            }
        };

        let initial = match build_initial(&base, &values) {
            Ok(initial) => Arc::new(initial),
            Err(e) => {
                error!("构建初始配置失败: {}", e);
                token.cancel();
                return Err(e);
            }
        };

        let current = Arc::new(ArcSwap::new(Arc::clone(&initial)));
        let (updates_tx, updates) = watch::channel(initial);
        let version = Arc::new(AtomicU64::new(1));

        let monitor = if watching {
            let monitor = Monitor::new(
                base,
                values,
                params.on_watched_error,
                Arc::clone(&current),
                updates_tx,
                Arc::clone(&version),
            );
            Some(tokio::spawn(monitor.run(rx, token.clone())))
        } else {
            debug!("没有可监听的配置源，句柄仅持有静态快照");
            None
        };

        info!("配置句柄创建完成，版本: 1");
        Ok(Self {
            ty,
            current,
            updates,
            version,
            monitor,
            token,
        })
    }

    /// 当前快照
    pub fn view(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// 快照更新通知
    ///
    /// 每次发布新快照后接收端被唤醒；读取落后的接收端只会看到最新的快照。
    pub fn events(&self) -> watch::Receiver<Arc<T>> {
        self.updates.clone()
    }

    /// 把当前快照复制到调用方提供的实例中
    ///
    /// # 返回
    /// * `Result<()>` - 目标类型与句柄的配置类型不一致时返回类型错误
    pub fn fill<U: Any>(&self, target: &mut U) -> Result<()> {
        let target: &mut dyn Any = target;
        match target.downcast_mut::<T>() {
            Some(target) => {
                *target = T::clone(&self.view());
                Ok(())
            }
            None => Err(StrataError::Type(TypeError {
                expected: std::any::type_name::<T>(),
                found: std::any::type_name::<U>(),
            })),
        }
    }

    /// 已发布快照的版本号
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// 监控任务是否仍在运行
    pub fn is_watching(&self) -> bool {
        self.monitor
            .as_ref()
            .is_some_and(|monitor| !monitor.is_finished())
    }

    /// 配置结构描述符
    pub fn descriptor(&self) -> &TypeDescriptor {
        self.ty.descriptor()
    }

    /// 停止监听并等待监控任务退出，最后的快照仍然可读
    pub async fn shutdown(&mut self) {
        self.token.cancel();
        if let Some(monitor) = self.monitor.take() {
            if let Err(e) = monitor.await {
                error!("配置监控任务异常退出: {}", e);
            }
        }
    }
}

impl<T: Schema> Drop for ConfigHandle<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl<T: Schema> fmt::Debug for ConfigHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("type", &self.ty.type_name())
            .field("version", &self.version())
            .field("watching", &self.is_watching())
            .finish()
    }
}

/// 依次读取配置源，并为可监听的配置源注册监听
///
/// # 返回
/// * `(Vec<SourceValue<T>>, bool)` - 各配置源的初始值，以及是否存在监听
async fn collect_sources<T: Schema>(
    sources: &[Box<dyn Source<T>>],
    ty: &Type<T>,
    tx: &mpsc::Sender<crate::source::WatchEvent<T>>,
    token: &CancellationToken,
) -> std::result::Result<(Vec<SourceValue<T>>, bool), SourceError> {
    let mut values = Vec::with_capacity(sources.len());
    let mut watching = false;

    for (index, source) in sources.iter().enumerate() {
        let id = SourceId(index);
        let value = source.value(ty).await?;
        debug!("已读取配置源 {} ({})", source.name(), id);
        values.push(SourceValue::new(id, source.name(), value));

        if let Some(watcher) = source.watcher() {
            let deliverer = Deliverer::new(id, tx.clone(), token.clone());
            watcher.watch(token.clone(), ty, deliverer).await?;
            debug!("已注册配置源监听 {} ({})", source.name(), id);
            watching = true;
        }
    }

    Ok((values, watching))
}

/// 合成并校验初始快照
fn build_initial<T: Schema>(base: &T, values: &[SourceValue<T>]) -> Result<T> {
    let initial = compose(base, values)?;
    initial.verify().map_err(VerificationError)?;
    Ok(initial)
}
