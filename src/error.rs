//! 错误处理模块
//!
//! 定义配置合成引擎的统一错误类型

use thiserror::Error;

/// Strata 的主要错误类型
#[derive(Error, Debug)]
pub enum StrataError {
    /// 配置源相关错误
    #[error("配置源错误: {0}")]
    Source(#[from] SourceError),

    /// 合成（覆盖）相关错误
    #[error("配置合成错误: {0}")]
    Merge(#[from] MergeError),

    /// 快照校验错误
    #[error("配置校验错误: {0}")]
    Verification(#[from] VerificationError),

    /// 类型不匹配错误
    #[error("类型错误: {0}")]
    Type(#[from] TypeError),
}

/// 配置源错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// 读取失败
    #[error("读取配置源 {source_name} 失败: {reason}")]
    Read { source_name: String, reason: String },

    /// 解码失败
    #[error("解码配置源 {source_name} 失败: {reason}")]
    Decode { source_name: String, reason: String },

    /// 字段寻址或解析失败
    #[error("配置源 {source_name} 字段错误: {error}")]
    Field {
        source_name: String,
        error: FieldError,
    },

    /// 注册监听失败
    #[error("配置源 {source_name} 监听失败: {reason}")]
    Watch { source_name: String, reason: String },

    /// 投递通道已关闭
    #[error("配置源 {source_name} 的投递通道已关闭")]
    Closed { source_name: String },
}

impl SourceError {
    /// 构造读取错误
    pub fn read(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Read {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// 构造解码错误
    pub fn decode(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// 构造字段错误
    pub fn field(source_name: impl Into<String>, error: FieldError) -> Self {
        Self::Field {
            source_name: source_name.into(),
            error,
        }
    }

    /// 构造监听错误
    pub fn watch(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Watch {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// 出错的配置源名称
    pub fn source_name(&self) -> &str {
        match self {
            Self::Read { source_name, .. }
            | Self::Decode { source_name, .. }
            | Self::Field { source_name, .. }
            | Self::Watch { source_name, .. }
            | Self::Closed { source_name } => source_name,
        }
    }
}

/// 按字段路径赋值时的错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("字段 `{path}`: {kind}")]
pub struct FieldError {
    /// 以点号分隔的字段路径
    pub path: String,
    /// 错误类别
    pub kind: FieldErrorKind,
}

/// 字段错误类别
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldErrorKind {
    /// 结构中不存在该字段
    #[error("未知字段")]
    Unknown,

    /// 路径止于嵌套结构，无法直接赋值
    #[error("嵌套结构不能直接赋值")]
    NotLeaf,

    /// 路径越过了标量字段
    #[error("标量字段不能包含子路径")]
    NotNested,

    /// 原始值无法解析为字段类型
    #[error("无法解析为 {type_name}: {reason}")]
    Parse {
        type_name: &'static str,
        reason: String,
    },
}

impl FieldError {
    /// 创建路径为空的字段错误，由上层逐级补全路径
    pub fn new(kind: FieldErrorKind) -> Self {
        Self {
            path: String::new(),
            kind,
        }
    }

    /// 创建解析错误
    pub fn parse<T: ?Sized, E: ToString>(reason: E) -> Self {
        Self::new(FieldErrorKind::Parse {
            type_name: std::any::type_name::<T>(),
            reason: reason.to_string(),
        })
    }

    /// 在路径前添加一级字段名
    pub fn within(mut self, field: &str) -> Self {
        self.path = join_path(field, &self.path);
        self
    }
}

/// 合成错误：源值与目标结构不一致
#[derive(Error, Debug, Clone, PartialEq)]
#[error("字段 `{path}`（来自 {source_name}）: {reason}")]
pub struct MergeError {
    /// 以点号分隔的字段路径
    pub path: String,
    /// 不匹配的原因
    pub reason: String,
    /// 产生该值的配置源
    pub source_name: String,
}

impl MergeError {
    /// 创建合成错误，路径与来源由上层补全
    pub fn new(reason: impl ToString) -> Self {
        Self {
            path: String::new(),
            reason: reason.to_string(),
            source_name: String::new(),
        }
    }

    /// 在路径前添加一级字段名
    pub fn within(mut self, field: &str) -> Self {
        self.path = join_path(field, &self.path);
        self
    }

    /// 记录产生该值的配置源
    pub fn from_source(mut self, source_name: &str) -> Self {
        self.source_name = source_name.to_string();
        self
    }
}

/// 快照校验错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct VerificationError(pub String);

/// 类型不匹配错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("期望类型 {expected}, 实际类型 {found}")]
pub struct TypeError {
    pub expected: &'static str,
    pub found: &'static str,
}

fn join_path(head: &str, tail: &str) -> String {
    if tail.is_empty() {
        head.to_string()
    } else {
        format!("{head}.{tail}")
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, StrataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_path_building() {
        let err = FieldError::new(FieldErrorKind::Unknown)
            .within("port")
            .within("web");
        assert_eq!(err.path, "web.port");
        assert!(err.to_string().contains("web.port"));
    }

    #[test]
    fn test_merge_error_display() {
        let err = MergeError::new("变体不一致")
            .within("backend")
            .from_source("file");
        let message = err.to_string();
        assert!(message.contains("backend"));
        assert!(message.contains("file"));
        assert!(message.contains("变体不一致"));
    }

    #[test]
    fn test_source_error_name() {
        let err = SourceError::read("env", "boom");
        assert_eq!(err.source_name(), "env");

        let wrapped: StrataError = err.into();
        assert!(matches!(wrapped, StrataError::Source(_)));
    }
}
