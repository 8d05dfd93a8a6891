//! 配置结构模块
//!
//! 提供配置结构描述、可选形态推导与字段寻址功能

pub mod descriptor;
pub mod overlay;

#[macro_use]
mod macros;

pub use descriptor::{FieldDescriptor, PartialBuilder, Shape, Type, TypeDescriptor};
pub use overlay::{Element, Overlay};

use crate::error::{FieldError, MergeError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// 顶层配置结构
///
/// 通常由 [`schema!`](crate::schema!) 宏生成，`Partial` 为与其同构的可选形态：
/// 每个字段都是 `Option<<F as Overlay>::Slot>`，嵌套结构递归地变为其自身的可选形态。
/// 生成的 `Overlay` 实现以 `Partial` 作为槽位类型。
///
/// 每个配置结构都带有 [`Verify`] 能力，配置句柄在构建初始快照和发布每个候选快照前
/// 都会调用它。
pub trait Schema: Overlay + Verify + Default + Debug {
    /// 可选形态
    type Partial: Clone
        + Default
        + Debug
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// 结构描述符
    fn descriptor() -> TypeDescriptor;

    /// 将可选形态逐字段合并到当前值上
    fn overlay_partial(&mut self, partial: &Self::Partial) -> Result<(), MergeError>;

    /// 按字段路径以原始字符串设置可选形态中的叶子字段
    fn assign_partial(partial: &mut Self::Partial, path: &[&str], raw: &str)
        -> Result<(), FieldError>;

    /// 把完整值转换为所有字段均已设置的可选形态
    fn to_partial(&self) -> Self::Partial;
}

/// 配置自检能力
///
/// 在每个候选快照发布前调用，必须快速且无副作用。默认实现总是通过；
/// 用 `schema!` 声明结构时写成 `struct Name => NamePartial: Verify { .. }`
/// 即可自行实现本 trait。
pub trait Verify {
    /// 校验配置
    ///
    /// # 返回
    /// * `Result<(), String>` - 校验结果，错误时返回错误信息
    fn verify(&self) -> Result<(), String> {
        Ok(())
    }
}
