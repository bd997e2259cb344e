//! 统一错误模型
//! 定义客户端对调用方暴露的所有错误类型

use thiserror::Error;

/// 传输层错误（网络、超时、请求构造）
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// 刷新令牌失败的原因
///
/// 同一次刷新的结果会分发给所有等待者，因此必须可克隆。
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error("Refresh request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Refresh response could not be parsed: {0}")]
    InvalidResponse(String),

    #[error("Refresh timed out after {0}s")]
    Timeout(u64),

    #[error("Refresh task aborted: {0}")]
    Aborted(String),
}

/// 凭据存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),

    #[error("Credential store corrupted: {0}")]
    Corrupted(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// 客户端错误类型
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Request failed with status {status}")]
    Status { status: u16, body: String },

    #[error("Session expired: {0}")]
    SessionExpired(#[from] RefreshError),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// 获取对应的 HTTP 状态码（仅对来自服务端或等价语义的错误）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::SessionExpired(_) | ClientError::NotLoggedIn => Some(401),
            ClientError::Forbidden(_) => Some(403),
            ClientError::InvalidRequest(_) => Some(400),
            ClientError::Config(_)
            | ClientError::Transport(_)
            | ClientError::Decode(_)
            | ClientError::Store(_) => None,
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Config(_) => "Configuration error".to_string(),
            ClientError::Transport(TransportError::Timeout) => "Request timed out".to_string(),
            ClientError::Transport(_) => "Network error occurred".to_string(),
            ClientError::Status { status, body } => {
                server_message(body).unwrap_or_else(|| format!("Request failed ({})", status))
            }
            ClientError::SessionExpired(_) | ClientError::NotLoggedIn => {
                "Session expired. Please log in again.".to_string()
            }
            ClientError::Forbidden(msg) => msg.clone(),
            ClientError::Decode(_) => "Unexpected response from server".to_string(),
            ClientError::Store(_) => "Local session storage error".to_string(),
            ClientError::InvalidRequest(msg) => msg.clone(),
        }
    }

    /// 会话是否已终止（需要重新登录）
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired(_) | ClientError::NotLoggedIn)
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(e: config::ConfigError) -> Self {
        ClientError::Config(e.to_string())
    }
}

/// 从业务错误响应体中提取 `message` 字段
fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = ClientError::Status {
            status: 403,
            body: String::new(),
        };
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(ClientError::NotLoggedIn.status_code(), Some(401));
        assert_eq!(
            ClientError::Transport(TransportError::Timeout).status_code(),
            None
        );
    }

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = ClientError::Status {
            status: 409,
            body: r#"{"message":"E-mail already registered"}"#.to_string(),
        };
        assert_eq!(err.user_message(), "E-mail already registered");

        let err = ClientError::Status {
            status: 500,
            body: "<html>oops</html>".to_string(),
        };
        assert_eq!(err.user_message(), "Request failed (500)");
    }

    #[test]
    fn test_user_message_no_sensitive_info() {
        let err = ClientError::Transport(TransportError::Network(
            "connection refused: 10.0.0.7:3333".to_string(),
        ));
        let message = err.user_message();
        assert_eq!(message, "Network error occurred");
        assert!(!message.contains("10.0.0.7"));
    }

    #[test]
    fn test_session_expired_classification() {
        let err = ClientError::from(RefreshError::Rejected { status: 401 });
        assert!(err.is_session_expired());
        assert!(!ClientError::Forbidden("no".to_string()).is_session_expired());
    }
}
