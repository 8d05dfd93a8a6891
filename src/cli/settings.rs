//! 示例配置结构
//!
//! 命令行工具用来演示合成、监听与校验的服务配置

use crate::schema::Verify;
use serde::Serialize;
use std::collections::HashMap;

crate::schema! {
    /// Web 服务器配置
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct WebSettings => WebSettingsPartial {
        /// 是否启用 Web 界面
        pub enabled: bool,
        /// 监听端口
        pub port: u16,
        /// 绑定地址
        pub bind_address: String,
        /// 是否只显示有问题的服务
        pub show_problems_only: bool,
        /// 界面布局类型
        pub layout_type: String,
        /// 页面刷新间隔（秒）
        pub refresh_interval_seconds: u32,
    }
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            show_problems_only: false,
            layout_type: "cards".to_string(),
            refresh_interval_seconds: 3,
        }
    }
}

crate::schema! {
    /// 服务全局配置
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct ServiceSettings => ServiceSettingsPartial: Verify {
        /// 默认 webhook URL
        pub default_webhook_url: Option<String>,
        /// 检测间隔（秒）
        pub check_interval_seconds: u64,
        /// 日志级别
        pub log_level: String,
        /// 请求超时时间（秒）
        pub request_timeout_seconds: u64,
        /// 最大并发检测数
        pub max_concurrent_checks: usize,
        /// 失败重试次数
        pub retry_attempts: u32,
        /// 重试间隔（秒）
        pub retry_delay_seconds: u64,
        /// 全局请求头
        pub headers: HashMap<String, String>,
        /// Web 服务器配置
        pub web: Option<WebSettings>,
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_webhook_url: None,
            check_interval_seconds: 60,
            log_level: "info".to_string(),
            request_timeout_seconds: 10,
            max_concurrent_checks: 50,
            retry_attempts: 3,
            retry_delay_seconds: 5,
            headers: HashMap::new(),
            web: None,
        }
    }
}

impl Verify for ServiceSettings {
    fn verify(&self) -> Result<(), String> {
        if self.check_interval_seconds == 0 {
            return Err("检测间隔不能为0".to_string());
        }

        if self.request_timeout_seconds == 0 {
            return Err("请求超时时间不能为0".to_string());
        }

        if self.max_concurrent_checks == 0 {
            return Err("最大并发检测数不能为0".to_string());
        }

        let valid_log_levels = ["debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "无效的日志级别: {}，支持的级别: {:?}",
                self.log_level, valid_log_levels
            ));
        }

        if let Some(url) = &self.default_webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("无效的webhook URL: {url}"));
            }
        }

        if let Some(web) = self.web.as_ref().filter(|web| web.enabled) {
            if web.port == 0 {
                return Err("无效的Web服务器端口: 0，端口不能为0".to_string());
            }

            if web.bind_address.is_empty() {
                return Err("Web服务器绑定地址不能为空".to_string());
            }

            let valid_layout_types = ["cards", "table"];
            if !valid_layout_types.contains(&web.layout_type.as_str()) {
                return Err(format!(
                    "无效的界面布局类型: {}，支持的类型: {:?}",
                    web.layout_type, valid_layout_types
                ));
            }

            if web.refresh_interval_seconds == 0 || web.refresh_interval_seconds > 300 {
                return Err("Web界面刷新间隔必须在1到300秒之间".to_string());
            }
        }

        Ok(())
    }
}
