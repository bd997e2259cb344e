//! 认证模块
//! 携带访问令牌发出请求，并在 401 时协调单次令牌刷新

pub mod coordinator;
pub mod token;

pub use coordinator::AuthClient;
pub use token::AccessToken;

/// 登录端点
pub const LOGIN_PATH: &str = "/auth/login";
/// 刷新端点（仅依赖 Cookie 凭据）
pub const REFRESH_PATH: &str = "/auth/refresh";
/// 忘记密码端点
pub const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
/// 重置密码端点
pub const RESET_PASSWORD_PATH: &str = "/auth/reset-password";
