//! 手动配置源
//!
//! 由调用方通过 [`ManualUpdater`] 推送新值的可监听配置源，适合对接远程配置中心
//! 等自带变更通知的系统

use crate::error::SourceError;
use crate::schema::{Schema, Type};
use crate::source::{Deliverer, Source, Watcher};
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

type Update<T> = Result<<T as Schema>::Partial, SourceError>;

/// 手动配置源
pub struct ManualSource<T: Schema> {
    name: String,
    initial: T::Partial,
    updates: Mutex<Option<mpsc::UnboundedReceiver<Update<T>>>>,
}

/// 手动配置源的更新句柄
#[derive(Clone)]
pub struct ManualUpdater<T: Schema> {
    name: String,
    tx: mpsc::UnboundedSender<Update<T>>,
}

impl<T: Schema> ManualSource<T> {
    /// 创建手动配置源
    ///
    /// # 参数
    /// * `name` - 配置源名称
    /// * `initial` - 初始贡献值
    ///
    /// # 返回
    /// * `(Self, ManualUpdater<T>)` - 配置源和更新句柄
    pub fn new(name: impl Into<String>, initial: T::Partial) -> (Self, ManualUpdater<T>) {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            name: name.clone(),
            initial,
            updates: Mutex::new(Some(rx)),
        };
        (source, ManualUpdater { name, tx })
    }
}

impl<T: Schema> ManualUpdater<T> {
    /// 推送新值
    pub fn push(&self, value: T::Partial) -> Result<(), SourceError> {
        self.send(Ok(value))
    }

    /// 推送一次读取失败
    pub fn fail(&self, error: SourceError) -> Result<(), SourceError> {
        self.send(Err(error))
    }

    fn send(&self, update: Update<T>) -> Result<(), SourceError> {
        self.tx.send(update).map_err(|_| SourceError::Closed {
            source_name: self.name.clone(),
        })
    }
}

#[async_trait]
impl<T: Schema> Source<T> for ManualSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn value(&self, _ty: &Type<T>) -> Result<T::Partial, SourceError> {
        Ok(self.initial.clone())
    }

    fn watcher(&self) -> Option<&dyn Watcher<T>> {
        Some(self)
    }
}

#[async_trait]
impl<T: Schema> Watcher<T> for ManualSource<T> {
    async fn watch(
        &self,
        token: CancellationToken,
        _ty: &Type<T>,
        deliver: Deliverer<T>,
    ) -> Result<(), SourceError> {
        let mut rx = self
            .updates
            .lock()
            .await
            .take()
            .ok_or_else(|| SourceError::watch(&self.name, "该配置源已被监听"))?;

        let name = self.name.clone();
        tokio::spawn(async move {
            loop {
                let update = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    update = rx.recv() => match update {
                        Some(update) => update,
                        None => break,
                    },
                };
                let delivered = match update {
                    Ok(value) => deliver.deliver(value).await,
                    Err(error) => deliver.report(error).await,
                };
                if !delivered {
                    break;
                }
            }
            debug!("手动配置源 {} 的监听已结束", name);
        });

        Ok(())
    }
}
