//! 配置合成模块
//!
//! 按优先级顺序将各配置源的可选形态值逐字段覆盖到基础实例上

use crate::error::MergeError;
use crate::schema::Schema;
use std::fmt;
use tracing::debug;

/// 配置源在优先级序列中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 配置源及其最近一次贡献的值
#[derive(Debug, Clone)]
pub struct SourceValue<T: Schema> {
    /// 配置源标识
    pub id: SourceId,
    /// 配置源名称
    pub name: String,
    /// 最近一次贡献的可选形态值
    pub value: T::Partial,
}

impl<T: Schema> SourceValue<T> {
    pub fn new(id: SourceId, name: impl Into<String>, value: T::Partial) -> Self {
        Self {
            id,
            name: name.into(),
            value,
        }
    }
}

/// 合成配置快照
///
/// # 参数
/// * `base` - 基础实例（调用方提供的空白或默认配置），每次合成都会先深拷贝
/// * `layers` - 按优先级升序排列的配置源值，越靠后优先级越高
///
/// # 返回
/// * `Result<T, MergeError>` - 合成后的全新实例；失败时工作实例直接丢弃
pub fn compose<'a, T, I>(base: &T, layers: I) -> Result<T, MergeError>
where
    T: Schema,
    I: IntoIterator<Item = &'a SourceValue<T>>,
{
    let mut working = base.clone();
    for layer in layers {
        debug!("合成配置层 {} ({})", layer.name, layer.id);
        working
            .overlay_partial(&layer.value)
            .map_err(|e| e.from_source(&layer.name))?;
    }
    Ok(working)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{FieldError, FieldErrorKind};
    use crate::schema::Overlay;
    use serde::{Deserialize, Serialize};

    crate::schema! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Limits => LimitsPartial {
            pub max_connections: u32,
            pub timeout_seconds: u64,
        }
    }

    crate::schema! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Settings => SettingsPartial {
            pub host: String,
            pub port: u16,
            pub tags: Vec<String>,
            pub limits: Limits,
        }
    }

    fn layer(index: usize, value: SettingsPartial) -> SourceValue<Settings> {
        SourceValue::new(SourceId(index), format!("layer-{index}"), value)
    }

    #[test]
    fn test_later_source_wins() {
        let layers = vec![
            layer(
                0,
                SettingsPartial {
                    host: Some("a.local".to_string()),
                    ..Default::default()
                },
            ),
            layer(
                1,
                SettingsPartial {
                    host: Some("b.local".to_string()),
                    ..Default::default()
                },
            ),
        ];

        let composed = compose(&Settings::default(), &layers).unwrap();
        assert_eq!(composed.host, "b.local");
    }

    #[test]
    fn test_partial_override_keeps_lower_fields() {
        let layers = vec![
            layer(
                0,
                SettingsPartial {
                    host: Some("a.local".to_string()),
                    port: Some(80),
                    ..Default::default()
                },
            ),
            layer(
                1,
                SettingsPartial {
                    port: Some(8080),
                    ..Default::default()
                },
            ),
        ];

        let composed = compose(&Settings::default(), &layers).unwrap();
        assert_eq!(composed.host, "a.local");
        assert_eq!(composed.port, 8080);
    }

    #[test]
    fn test_explicit_zero_overrides() {
        let layers = vec![
            layer(
                0,
                SettingsPartial {
                    port: Some(80),
                    ..Default::default()
                },
            ),
            layer(
                1,
                SettingsPartial {
                    port: Some(0),
                    ..Default::default()
                },
            ),
        ];

        let composed = compose(&Settings::default(), &layers).unwrap();
        assert_eq!(composed.port, 0);
    }

    #[test]
    fn test_nested_fields_from_different_sources() {
        let layers = vec![
            layer(
                0,
                SettingsPartial {
                    limits: Some(LimitsPartial {
                        max_connections: Some(100),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ),
            layer(
                1,
                SettingsPartial {
                    limits: Some(LimitsPartial {
                        timeout_seconds: Some(30),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ),
        ];

        let composed = compose(&Settings::default(), &layers).unwrap();
        assert_eq!(composed.limits.max_connections, 100);
        assert_eq!(composed.limits.timeout_seconds, 30);
    }

    #[test]
    fn test_repeated_layer_is_idempotent() {
        let value = SettingsPartial {
            host: Some("a.local".to_string()),
            tags: Some(vec!["x".to_string()]),
            ..Default::default()
        };
        let base = Settings {
            port: 9000,
            ..Default::default()
        };

        let once = compose(&base, &[layer(0, value.clone())]).unwrap();
        let twice = compose(&base, &[layer(0, value.clone()), layer(1, value)]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_base_and_layers_are_not_aliased() {
        let base = Settings {
            tags: vec!["base".to_string()],
            ..Default::default()
        };
        let layers = vec![layer(
            0,
            SettingsPartial {
                tags: Some(vec!["layer".to_string()]),
                ..Default::default()
            },
        )];

        let mut first = compose(&base, &layers).unwrap();
        first.tags.push("mutated".to_string());

        let second = compose(&base, &layers).unwrap();
        assert_eq!(second.tags, vec!["layer".to_string()]);
        assert_eq!(base.tags, vec!["base".to_string()]);
        assert_eq!(layers[0].value.tags, Some(vec!["layer".to_string()]));
    }

    #[test]
    fn test_empty_layers_returns_base() {
        let base = Settings {
            host: "default.local".to_string(),
            ..Default::default()
        };
        let layers: Vec<SourceValue<Settings>> = Vec::new();
        assert_eq!(compose(&base, &layers).unwrap(), base);
    }

    /// 存储后端：变体之间不能互相覆盖
    #[derive(Debug, Clone, Default, PartialEq)]
    pub enum Backend {
        #[default]
        Memory,
        Redis {
            url: String,
        },
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum BackendSlot {
        Memory,
        Redis { url: Option<String> },
    }

    impl Overlay for Backend {
        type Slot = BackendSlot;

        fn overlay(&mut self, slot: &BackendSlot) -> Result<(), MergeError> {
            match (self, slot) {
                (this, BackendSlot::Memory) => {
                    *this = Backend::Memory;
                    Ok(())
                }
                (Backend::Redis { url }, BackendSlot::Redis { url: Some(new) }) => {
                    url.clone_from(new);
                    Ok(())
                }
                (Backend::Redis { .. }, BackendSlot::Redis { url: None }) => Ok(()),
                (this, BackendSlot::Redis { url: Some(new) }) => {
                    *this = Backend::Redis { url: new.clone() };
                    Ok(())
                }
                (Backend::Memory, BackendSlot::Redis { url: None }) => {
                    Err(MergeError::new("memory 后端上不能只覆盖 redis 的部分字段"))
                }
            }
        }

        fn to_slot(&self) -> Option<BackendSlot> {
            Some(match self {
                Backend::Memory => BackendSlot::Memory,
                Backend::Redis { url } => BackendSlot::Redis {
                    url: Some(url.clone()),
                },
            })
        }

        fn assign(
            _slot: &mut Option<BackendSlot>,
            _path: &[&str],
            _raw: &str,
        ) -> Result<(), FieldError> {
            Err(FieldError::new(FieldErrorKind::NotLeaf))
        }
    }

    crate::schema! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Storage => StoragePartial {
            pub backend: Backend,
        }
    }

    #[test]
    fn test_structural_mismatch_is_merge_error() {
        let layers = vec![SourceValue::<Storage>::new(
            SourceId(0),
            "remote",
            StoragePartial {
                backend: Some(BackendSlot::Redis { url: None }),
            },
        )];

        let err = compose(&Storage::default(), &layers).unwrap_err();
        assert_eq!(err.path, "backend");
        assert_eq!(err.source_name, "remote");
    }
}
