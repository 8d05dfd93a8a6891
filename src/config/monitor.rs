//! 配置监控任务
//!
//! 串行处理各配置源的变更事件：替换对应配置源的值、重新合成、校验，
//! 成功后原子地发布新快照

use crate::compose::{compose, SourceValue};
use crate::config::manager::WatchedErrorHandler;
use crate::error::{StrataError, VerificationError};
use crate::schema::Schema;
use crate::source::WatchEvent;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 每个可监听的配置句柄对应一个监控任务，是快照的唯一写入方
pub(crate) struct Monitor<T: Schema> {
    base: T,
    values: Vec<SourceValue<T>>,
    on_error: Option<WatchedErrorHandler<T>>,
    current: Arc<ArcSwap<T>>,
    updates: watch::Sender<Arc<T>>,
    version: Arc<AtomicU64>,
}

impl<T: Schema> Monitor<T> {
    pub(crate) fn new(
        base: T,
        values: Vec<SourceValue<T>>,
        on_error: Option<WatchedErrorHandler<T>>,
        current: Arc<ArcSwap<T>>,
        updates: watch::Sender<Arc<T>>,
        version: Arc<AtomicU64>,
    ) -> Self {
        Self {
            base,
            values,
            on_error,
            current,
            updates,
            version,
        }
    }

    /// 运行监控循环，直到取消或所有配置源的投递端都已关闭
    pub(crate) async fn run(
        mut self,
        mut rx: mpsc::Receiver<WatchEvent<T>>,
        token: CancellationToken,
    ) {
        info!("配置监控任务已启动，配置源数量: {}", self.values.len());

        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("配置监控任务收到取消信号");
                    break;
                }
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => {
                        info!("所有配置源的监听均已结束");
                        break;
                    }
                },
            };
            self.handle_event(event);
        }

        info!("配置监控任务已停止");
    }

    fn handle_event(&mut self, event: WatchEvent<T>) {
        debug!("收到配置源 {} 的变更事件", event.source);

        let partial = match event.payload {
            Ok(partial) => partial,
            Err(e) => {
                warn!("配置源重新读取失败: {}", e);
                self.report(&e.into(), None);
                return;
            }
        };

        match self.values.iter_mut().find(|value| value.id == event.source) {
            Some(value) => value.value = partial,
            None => {
                warn!("收到未知配置源 {} 的事件，已忽略", event.source);
                return;
            }
        }

        let candidate = match compose(&self.base, &self.values) {
            Ok(candidate) => candidate,
            Err(e) => {
                error!("重新合成配置失败: {}", e);
                self.report(&e.into(), None);
                return;
            }
        };

        if let Err(reason) = candidate.verify() {
            warn!("新配置未通过校验，保留当前快照: {}", reason);
            self.report(&VerificationError(reason).into(), Some(&candidate));
            return;
        }

        self.publish(candidate);
    }

    fn report(&self, error: &StrataError, candidate: Option<&T>) {
        if let Some(on_error) = &self.on_error {
            let current = self.current.load_full();
            on_error(error, current.as_ref(), candidate);
        }
    }

    fn publish(&self, candidate: T) {
        let snapshot = Arc::new(candidate);
        self.current.store(Arc::clone(&snapshot));
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        self.updates.send_replace(snapshot);
        info!("配置快照已更新，版本: {}", version);
    }
}
