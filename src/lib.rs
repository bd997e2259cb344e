//! 管理控制台客户端库
//! 认证请求、单次令牌刷新与会话管理

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod services;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use auth::{AccessToken, AuthClient};
pub use config::ClientConfig;
pub use error::{ClientError, RefreshError, StoreError, TransportError};
pub use transport::{ApiResponse, HttpTransport, RequestSpec};
