//! 解码器
//!
//! 把文本内容解码为可选形态值，缺失的字段保持未设置

use crate::error::SourceError;
use crate::schema::{Schema, Type};
use std::path::Path;

/// 解码器接口，供基于文件或流的配置源使用
pub trait Decoder<T: Schema>: Send + Sync {
    /// 解码器名称，出现在错误信息中
    fn name(&self) -> &'static str;

    /// 解码原始内容
    ///
    /// # 参数
    /// * `input` - 原始文本
    /// * `ty` - 目标配置类型描述
    ///
    /// # 返回
    /// * `Result<T::Partial, String>` - 可选形态值或解码失败原因
    fn decode(&self, input: &str, ty: &Type<T>) -> Result<T::Partial, String>;
}

/// TOML 解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlDecoder;

impl<T: Schema> Decoder<T> for TomlDecoder {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn decode(&self, input: &str, _ty: &Type<T>) -> Result<T::Partial, String> {
        toml::from_str(input).map_err(|e| format!("TOML解析失败: {e}"))
    }
}

/// JSON 解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl<T: Schema> Decoder<T> for JsonDecoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, input: &str, _ty: &Type<T>) -> Result<T::Partial, String> {
        serde_json::from_str(input).map_err(|e| format!("JSON解析失败: {e}"))
    }
}

/// 按文件扩展名选择解码器，未知扩展名返回 `None`
pub fn decoder_for_path<T: Schema>(path: &Path) -> Option<Box<dyn Decoder<T>>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Some(Box::new(TomlDecoder)),
        Some("json") => Some(Box::new(JsonDecoder)),
        _ => None,
    }
}

/// 解码并把失败包装为配置源错误
pub(crate) fn decode_with<T: Schema>(
    decoder: &dyn Decoder<T>,
    source_name: &str,
    input: &str,
    ty: &Type<T>,
) -> Result<T::Partial, SourceError> {
    decoder
        .decode(input, ty)
        .map_err(|reason| SourceError::decode(source_name, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::schema! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Global => GlobalPartial {
            pub check_interval_seconds: u64,
            pub log_level: String,
            pub expected_status_codes: Vec<u16>,
        }
    }

    #[test]
    fn test_toml_decoder_leaves_missing_fields_unset() {
        let partial = Decoder::<Global>::decode(
            &TomlDecoder,
            "check_interval_seconds = 30\nexpected_status_codes = [200, 201]\n",
            &Type::new(),
        )
        .unwrap();
        assert_eq!(partial.check_interval_seconds, Some(30));
        assert_eq!(partial.expected_status_codes, Some(vec![200, 201]));
        assert_eq!(partial.log_level, None);
    }

    #[test]
    fn test_json_decoder_error() {
        let result = Decoder::<Global>::decode(&JsonDecoder, "{not json", &Type::new());
        assert!(result.unwrap_err().contains("JSON解析失败"));
    }

    #[test]
    fn test_decoder_for_path() {
        assert_eq!(
            decoder_for_path::<Global>(Path::new("config.toml")).map(|d| d.name()),
            Some("toml")
        );
        assert_eq!(
            decoder_for_path::<Global>(Path::new("config.json")).map(|d| d.name()),
            Some("json")
        );
        assert!(decoder_for_path::<Global>(Path::new("config.ini")).is_none());
    }
}
