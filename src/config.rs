//! 配置系统
//! 从环境变量加载客户端配置（前缀 ADMIN_）

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 后端 API 基础地址，例如 "http://localhost:3333"
    pub base_url: String,
    /// 单个请求超时时间（秒）
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// 刷新令牌请求的超时时间（秒）
    pub refresh_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// 凭据存储后端: memory, file
    pub store: String,
    /// 文件存储路径（store = file 时使用）
    pub store_path: String,
    /// 登录入口路径，会话失效后重定向到这里
    pub login_path: String,
    /// 会话过期通知与重定向之间的延迟（毫秒）
    pub redirect_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:3333".to_string(),
                request_timeout_secs: 30,
            },
            auth: AuthConfig {
                refresh_timeout_secs: 15,
            },
            session: SessionConfig {
                store: "memory".to_string(),
                store_path: ".admin-session.json".to_string(),
                login_path: "/".to_string(),
                redirect_delay_ms: 3000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

impl ClientConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("api.base_url", "http://localhost:3333")?
            .set_default("api.request_timeout_secs", 30)?
            .set_default("auth.refresh_timeout_secs", 15)?
            .set_default("session.store", "memory")?
            .set_default("session.store_path", ".admin-session.json")?
            .set_default("session.login_path", "/")?
            .set_default("session.redirect_delay_ms", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?;

        // 从环境变量加载配置（前缀为 ADMIN_）
        settings = settings.add_source(
            Environment::with_prefix("ADMIN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: ClientConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.refresh_timeout_secs)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.session.redirect_delay_ms)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::Message(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ConfigError::Message(format!(
                "api.base_url must use http or https, got {}",
                base.scheme()
            )));
        }

        if self.api.request_timeout_secs == 0 || self.api.request_timeout_secs > 300 {
            return Err(ConfigError::Message(
                "request_timeout_secs must be between 1 and 300".to_string(),
            ));
        }

        if self.auth.refresh_timeout_secs == 0 || self.auth.refresh_timeout_secs > 120 {
            return Err(ConfigError::Message(
                "refresh_timeout_secs must be between 1 and 120".to_string(),
            ));
        }

        match self.session.store.to_lowercase().as_str() {
            "memory" | "file" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid session store: {}. Must be one of: memory, file",
                    self.session.store
                )))
            }
        }

        if !self.session.login_path.starts_with('/') {
            return Err(ConfigError::Message(
                "login_path must be an absolute path".to_string(),
            ));
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }
}
