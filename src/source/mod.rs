//! 配置源模块
//!
//! 定义配置源、解码器与监听能力的接口，以及几个常用的配置源实现

pub mod decoder;
pub mod env;
pub mod file;
pub mod manual;
pub mod static_source;

pub use decoder::{Decoder, JsonDecoder, TomlDecoder};
pub use env::EnvSource;
pub use file::FileSource;
pub use manual::{ManualSource, ManualUpdater};
pub use static_source::StaticSource;

use crate::compose::SourceId;
use crate::error::SourceError;
use crate::schema::{Schema, Type};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 配置源
///
/// 每个配置源在优先级序列中有固定位置，越靠后优先级越高。
#[async_trait]
pub trait Source<T: Schema>: Send + Sync {
    /// 配置源名称，用于日志与错误信息
    fn name(&self) -> &str;

    /// 读取该配置源的贡献值
    ///
    /// # 参数
    /// * `ty` - 目标配置类型描述
    ///
    /// # 返回
    /// * `Result<T::Partial, SourceError>` - 可选形态的配置值或错误
    async fn value(&self, ty: &Type<T>) -> Result<T::Partial, SourceError>;

    /// 监听能力，不支持监听的配置源返回 `None`
    fn watcher(&self) -> Option<&dyn Watcher<T>> {
        None
    }
}

/// 配置源的监听能力
#[async_trait]
pub trait Watcher<T: Schema>: Send + Sync {
    /// 注册监听
    ///
    /// 实现方自行启动发射任务，在检测到变化时通过 `deliver` 投递新值；
    /// `token` 取消后不得再投递。
    ///
    /// # 参数
    /// * `token` - 监听生命周期
    /// * `ty` - 目标配置类型描述
    /// * `deliver` - 绑定到该配置源的投递器
    async fn watch(
        &self,
        token: CancellationToken,
        ty: &Type<T>,
        deliver: Deliverer<T>,
    ) -> Result<(), SourceError>;
}

/// 监听事件：来源标识与新值（或重新读取失败的错误）
#[derive(Debug)]
pub struct WatchEvent<T: Schema> {
    pub source: SourceId,
    pub payload: Result<T::Partial, SourceError>,
}

/// 投递器，把配置源的变更送入共享通道
///
/// 每次发送都与取消信号竞争，取消后立即返回，不会无限阻塞。
pub struct Deliverer<T: Schema> {
    source: SourceId,
    tx: mpsc::Sender<WatchEvent<T>>,
    token: CancellationToken,
}

impl<T: Schema> Deliverer<T> {
    pub(crate) fn new(
        source: SourceId,
        tx: mpsc::Sender<WatchEvent<T>>,
        token: CancellationToken,
    ) -> Self {
        Self { source, tx, token }
    }

    /// 投递新值
    ///
    /// # 返回
    /// * `bool` - 是否投递成功；已取消或通道关闭时返回 `false`
    pub async fn deliver(&self, value: T::Partial) -> bool {
        self.send(Ok(value)).await
    }

    /// 报告重新读取失败，由监控任务转交给错误回调
    pub async fn report(&self, error: SourceError) -> bool {
        self.send(Err(error)).await
    }

    /// 监听是否已被取消
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.tx.is_closed()
    }

    /// 等待取消
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// 绑定的配置源标识
    pub fn source(&self) -> SourceId {
        self.source
    }

    async fn send(&self, payload: Result<T::Partial, SourceError>) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        let event = WatchEvent {
            source: self.source,
            payload,
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }
}

impl<T: Schema> Clone for Deliverer<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            tx: self.tx.clone(),
            token: self.token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::schema! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Probe => ProbePartial {
            pub value: u32,
        }
    }

    #[tokio::test]
    async fn test_deliver_reaches_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let deliverer = Deliverer::<Probe>::new(SourceId(3), tx, token);

        assert!(
            deliverer
                .deliver(ProbePartial { value: Some(7) })
                .await
        );
        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, SourceId(3));
        assert_eq!(event.payload, Ok(ProbePartial { value: Some(7) }));
    }

    #[tokio::test]
    async fn test_deliver_after_cancel_returns_false() {
        let (tx, mut rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let deliverer = Deliverer::<Probe>::new(SourceId(0), tx, token.clone());

        token.cancel();
        assert!(!deliverer.deliver(ProbePartial::default()).await);
        assert!(deliverer.is_cancelled());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_blocked_deliver_unblocks_on_cancel() {
        let (tx, _rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let deliverer = Deliverer::<Probe>::new(SourceId(0), tx, token.clone());

        // 填满通道，下一次发送会阻塞
        assert!(deliverer.deliver(ProbePartial::default()).await);

        let blocked = {
            let deliverer = deliverer.clone();
            tokio::spawn(async move { deliverer.deliver(ProbePartial::default()).await })
        };
        tokio::task::yield_now().await;
        token.cancel();

        let delivered = tokio::time::timeout(std::time::Duration::from_secs(1), blocked)
            .await
            .expect("取消后发送应立即返回")
            .unwrap();
        assert!(!delivered);
    }
}
