//! 认证相关数据模型

use serde::{Deserialize, Serialize};

use super::user::SessionUser;

/// 登录请求
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// 登录响应
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: SessionUser,
}

/// 刷新令牌响应
///
/// 刷新令牌可选，缺省时保留现有 Cookie。
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// 忘记密码请求
#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// 重置密码请求
#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}
