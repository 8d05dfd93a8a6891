//! 环境变量配置源
//!
//! 按结构描述符为每个叶子字段推导变量名：`前缀_字段_子字段`，全部大写。
//! 例如前缀 `APP` 下的 `web.port` 对应 `APP_WEB_PORT`。

use crate::error::SourceError;
use crate::schema::{Schema, Type};
use crate::source::Source;
use async_trait::async_trait;
use std::marker::PhantomData;
use tracing::debug;

/// 环境变量配置源
#[derive(Debug, Clone)]
pub struct EnvSource<T: Schema> {
    prefix: Option<String>,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Schema> EnvSource<T> {
    /// 创建带前缀的环境变量配置源
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            name: format!("env:{prefix}"),
            prefix: Some(prefix),
            _marker: PhantomData,
        }
    }

    /// 创建不带前缀的环境变量配置源
    pub fn new() -> Self {
        Self {
            name: "env".to_string(),
            prefix: None,
            _marker: PhantomData,
        }
    }

    /// 计算字段路径对应的环境变量名
    pub fn variable_name(&self, path: &[&str]) -> String {
        let mut segments: Vec<String> = Vec::with_capacity(path.len() + 1);
        if let Some(prefix) = self.prefix.as_deref().filter(|p| !p.is_empty()) {
            segments.push(prefix.trim_end_matches('_').to_string());
        }
        segments.extend(path.iter().map(|segment| segment.to_string()));
        segments.join("_").to_uppercase()
    }
}

impl<T: Schema> Default for EnvSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Schema> Source<T> for EnvSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn value(&self, ty: &Type<T>) -> Result<T::Partial, SourceError> {
        let mut builder = ty.builder();
        for path in ty.descriptor().leaf_paths() {
            let variable = self.variable_name(&path);
            match std::env::var(&variable) {
                Ok(raw) => {
                    debug!("从环境变量 {} 读取字段 {}", variable, path.join("."));
                    builder
                        .set(&path, &raw)
                        .map_err(|e| SourceError::field(&self.name, e))?;
                }
                Err(std::env::VarError::NotPresent) => {}
                Err(e) => return Err(SourceError::read(&self.name, format!("{variable}: {e}"))),
            }
        }
        Ok(builder.finish())
    }
}
