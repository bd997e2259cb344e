//! 基于认证客户端的控制台业务服务

pub mod auth_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use user_service::UserService;
