//! 静态配置源
//!
//! 贡献一个固定的可选形态值，不支持监听

use crate::error::SourceError;
use crate::schema::{Schema, Type};
use crate::source::Source;
use async_trait::async_trait;

/// 静态配置源
#[derive(Debug, Clone)]
pub struct StaticSource<T: Schema> {
    name: String,
    value: T::Partial,
}

impl<T: Schema> StaticSource<T> {
    /// 以可选形态值创建，未设置的字段不参与覆盖
    pub fn new(name: impl Into<String>, value: T::Partial) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// 以完整配置值创建
    ///
    /// 非 `Option` 字段都参与覆盖；值为 `None` 的 `Option` 字段保持未设置，
    /// 不会清空低优先级配置源提供的值。
    pub fn from_config(name: impl Into<String>, config: &T) -> Self {
        Self::new(name, config.to_partial())
    }
}

#[async_trait]
impl<T: Schema> Source<T> for StaticSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn value(&self, _ty: &Type<T>) -> Result<T::Partial, SourceError> {
        Ok(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, SourceId, SourceValue};

    crate::schema! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Notifier => NotifierPartial {
            pub enabled: bool,
            pub webhook_url: Option<String>,
        }
    }

    #[tokio::test]
    async fn test_from_config_leaves_none_unset() {
        let ty = Type::<Notifier>::new();
        let source = StaticSource::from_config("defaults", &Notifier::default());
        let partial = source.value(&ty).await.unwrap();
        assert_eq!(partial.enabled, Some(false));
        assert_eq!(partial.webhook_url, None);

        let layers = vec![
            SourceValue::<Notifier>::new(
                SourceId(0),
                "file",
                NotifierPartial {
                    enabled: Some(true),
                    webhook_url: Some("https://hooks.example.com".to_string()),
                },
            ),
            SourceValue::new(SourceId(1), source.name(), partial),
        ];
        let composed = compose(&Notifier::default(), &layers).unwrap();
        assert!(!composed.enabled);
        assert_eq!(
            composed.webhook_url.as_deref(),
            Some("https://hooks.example.com")
        );
    }
}
