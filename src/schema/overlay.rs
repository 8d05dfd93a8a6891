//! 字段覆盖规则
//!
//! `Overlay` 为每种字段类型规定其可选形态（`Slot`）以及如何把一个已设置的
//! 槽位合并到目标字段上。叶子类型整体替换，嵌套配置结构逐字段递归合并。

use crate::error::{FieldError, FieldErrorKind, MergeError};
use crate::schema::descriptor::Shape;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::path::PathBuf;

/// 可参与覆盖合成的字段类型
///
/// 字段在可选形态中的类型为 `Option<Self::Slot>`：`None` 表示该配置源对此字段
/// 没有意见，`Some` 表示显式设置（即使是零值）。
pub trait Overlay: Clone + Send + Sync + 'static {
    /// 该字段被设置时携带的值类型
    type Slot: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// 字段形态描述
    fn shape() -> Shape {
        Shape::Leaf {
            type_name: std::any::type_name::<Self>(),
            optional_type_name: std::any::type_name::<Option<Self::Slot>>(),
        }
    }

    /// 将已设置的槽位合并到当前值上
    fn overlay(&mut self, slot: &Self::Slot) -> Result<(), MergeError>;

    /// 把完整值转换为槽位
    fn to_slot(&self) -> Option<Self::Slot>;

    /// 按剩余路径以原始字符串设置槽位
    ///
    /// # 参数
    /// * `slot` - 要写入的槽位
    /// * `path` - 相对该字段的剩余路径，叶子字段要求为空
    /// * `raw` - 原始字符串值
    fn assign(slot: &mut Option<Self::Slot>, path: &[&str], raw: &str) -> Result<(), FieldError>;
}

fn ensure_leaf(path: &[&str]) -> Result<(), FieldError> {
    if path.is_empty() {
        Ok(())
    } else {
        Err(FieldError::new(FieldErrorKind::NotNested))
    }
}

macro_rules! scalar_leaves {
    ($($t:ty),* $(,)?) => {
        $(
            impl Overlay for $t {
                type Slot = $t;

                fn overlay(&mut self, slot: &Self::Slot) -> Result<(), MergeError> {
                    self.clone_from(slot);
                    Ok(())
                }

                fn to_slot(&self) -> Option<Self::Slot> {
                    Some(self.clone())
                }

                fn assign(
                    slot: &mut Option<Self::Slot>,
                    path: &[&str],
                    raw: &str,
                ) -> Result<(), FieldError> {
                    ensure_leaf(path)?;
                    let value = raw.trim().parse::<$t>().map_err(|e| FieldError::parse::<$t, _>(e))?;
                    *slot = Some(value);
                    Ok(())
                }
            }
        )*
    };
}

scalar_leaves!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl Overlay for String {
    type Slot = String;

    fn overlay(&mut self, slot: &Self::Slot) -> Result<(), MergeError> {
        self.clone_from(slot);
        Ok(())
    }

    fn to_slot(&self) -> Option<Self::Slot> {
        Some(self.clone())
    }

    fn assign(slot: &mut Option<Self::Slot>, path: &[&str], raw: &str) -> Result<(), FieldError> {
        ensure_leaf(path)?;
        *slot = Some(raw.to_string());
        Ok(())
    }
}

impl Overlay for PathBuf {
    type Slot = PathBuf;

    fn overlay(&mut self, slot: &Self::Slot) -> Result<(), MergeError> {
        self.clone_from(slot);
        Ok(())
    }

    fn to_slot(&self) -> Option<Self::Slot> {
        Some(self.clone())
    }

    fn assign(slot: &mut Option<Self::Slot>, path: &[&str], raw: &str) -> Result<(), FieldError> {
        ensure_leaf(path)?;
        *slot = Some(PathBuf::from(raw));
        Ok(())
    }
}

// 集合类型的原始值按 JSON 解析
macro_rules! collection_leaves {
    ($( [$($bounds:tt)*] $t:ty ),* $(,)?) => {
        $(
            impl<$($bounds)*> Overlay for $t {
                type Slot = $t;

                fn overlay(&mut self, slot: &Self::Slot) -> Result<(), MergeError> {
                    self.clone_from(slot);
                    Ok(())
                }

                fn to_slot(&self) -> Option<Self::Slot> {
                    Some(self.clone())
                }

                fn assign(
                    slot: &mut Option<Self::Slot>,
                    path: &[&str],
                    raw: &str,
                ) -> Result<(), FieldError> {
                    ensure_leaf(path)?;
                    let value = serde_json::from_str::<$t>(raw).map_err(|e| FieldError::parse::<$t, _>(e))?;
                    *slot = Some(value);
                    Ok(())
                }
            }
        )*
    };
}

collection_leaves!(
    [V: Element] Vec<V>,
    [V: Element + Eq + Hash] HashSet<V>,
    [V: Element + Ord] BTreeSet<V>,
    [K: Element + Eq + Hash, V: Element] HashMap<K, V>,
    [K: Element + Ord, V: Element] BTreeMap<K, V>,
);

/// 集合元素需要满足的约束
pub trait Element: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<E> Element for E where E: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// `Option` 字段与其内部类型共享同一槽位类型，可选形态不会被重复包裹
impl<T: Overlay + Default> Overlay for Option<T> {
    type Slot = T::Slot;

    fn shape() -> Shape {
        match T::shape() {
            Shape::Leaf {
                optional_type_name, ..
            } => Shape::Leaf {
                type_name: std::any::type_name::<Self>(),
                optional_type_name,
            },
            nested => nested,
        }
    }

    fn overlay(&mut self, slot: &Self::Slot) -> Result<(), MergeError> {
        self.get_or_insert_with(T::default).overlay(slot)
    }

    fn to_slot(&self) -> Option<Self::Slot> {
        self.as_ref().and_then(T::to_slot)
    }

    fn assign(slot: &mut Option<Self::Slot>, path: &[&str], raw: &str) -> Result<(), FieldError> {
        T::assign(slot, path, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_assign_and_overlay() {
        let mut slot = None;
        u16::assign(&mut slot, &[], " 8080 ").unwrap();
        assert_eq!(slot, Some(8080));

        let mut port = 80u16;
        port.overlay(&8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_scalar_assign_rejects_subpath() {
        let mut slot = None;
        let err = bool::assign(&mut slot, &["nested"], "true").unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::NotNested);
        assert!(slot.is_none());
    }

    #[test]
    fn test_scalar_assign_parse_error() {
        let mut slot = None;
        let err = u8::assign(&mut slot, &[], "300").unwrap_err();
        assert!(matches!(err.kind, FieldErrorKind::Parse { type_name: "u8", .. }));
    }

    #[test]
    fn test_string_assign_keeps_whitespace() {
        let mut slot = None;
        String::assign(&mut slot, &[], " padded ").unwrap();
        assert_eq!(slot.as_deref(), Some(" padded "));
    }

    #[test]
    fn test_collection_assign_from_json() {
        let mut slot = None;
        Vec::<u16>::assign(&mut slot, &[], "[200, 201]").unwrap();
        assert_eq!(slot, Some(vec![200, 201]));

        let mut headers = None;
        HashMap::<String, String>::assign(&mut headers, &[], r#"{"X-Token":"abc"}"#).unwrap();
        assert_eq!(
            headers.unwrap().get("X-Token").map(String::as_str),
            Some("abc")
        );
    }

    #[test]
    fn test_collection_overlay_replaces_whole_value() {
        let mut codes = vec![200, 201, 204];
        codes.overlay(&vec![500]).unwrap();
        assert_eq!(codes, vec![500]);
    }

    #[test]
    fn test_option_is_not_wrapped_twice() {
        // Option<String> 与 String 的可选形态相同
        assert_eq!(
            std::any::type_name::<Option<<Option<String> as Overlay>::Slot>>(),
            std::any::type_name::<Option<<String as Overlay>::Slot>>()
        );
        assert_eq!(
            <Option<Option<u32>> as Overlay>::shape(),
            Shape::Leaf {
                type_name: std::any::type_name::<Option<Option<u32>>>(),
                optional_type_name: std::any::type_name::<Option<u32>>(),
            }
        );
    }

    #[test]
    fn test_option_overlay_fills_none() {
        let mut value: Option<String> = None;
        value.overlay(&"hello".to_string()).unwrap();
        assert_eq!(value.as_deref(), Some("hello"));

        let empty: Option<u32> = None;
        assert_eq!(empty.to_slot(), None);
    }
}
