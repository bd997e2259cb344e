//! 认证服务：登录、登出、找回密码

use tracing::{info, warn};

use crate::{
    auth::{AuthClient, FORGOT_PASSWORD_PATH, LOGIN_PATH, RESET_PASSWORD_PATH},
    error::ClientError,
    models::{auth::*, user::SessionUser},
    realtime::SessionEvent,
    session::sets_refresh_cookie,
    transport::RequestSpec,
};

pub struct AuthService {
    client: AuthClient,
}

impl AuthService {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    /// 用户登录
    ///
    /// 登录请求不携带旧令牌，也不触发刷新：错误的密码返回 401 时
    /// 直接作为业务错误交给调用方。
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, ClientError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self
            .client
            .send_unauthenticated(RequestSpec::post(LOGIN_PATH).json(&req)?)
            .await?
            .error_for_status()?;

        let login: LoginResponse = response.json()?;

        self.client.session().begin(&login.access_token, &login.user)?;

        if let Some(refresh_token) = login.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            if !sets_refresh_cookie(&response.headers) {
                let cookie = self.client.cookie_policy().issue(refresh_token);
                self.client.transport().store_cookie(&cookie);
            }
        }

        info!(user_id = %login.user.id, role = %login.user.role, "User logged in");
        self.client.events().publish(SessionEvent::LoggedIn {
            user_id: login.user.id.clone(),
        });

        Ok(login.user)
    }

    /// 登出：清除本地凭据并让刷新 Cookie 过期
    pub fn logout(&self) {
        let user_id = self.client.session().current_user().map(|u| u.id);

        self.client.session().clear();
        let cookie = self.client.cookie_policy().expire();
        self.client.transport().store_cookie(&cookie);

        info!(user_id = ?user_id, "User logged out");
        self.client.events().publish(SessionEvent::LoggedOut);
    }

    /// 当前登录用户（需要令牌与用户信息同时存在）
    pub fn current_user(&self) -> Result<SessionUser, ClientError> {
        let session = self.client.session();
        if !session.is_authenticated() {
            return Err(ClientError::NotLoggedIn);
        }
        session.current_user().ok_or(ClientError::NotLoggedIn)
    }

    /// 发送重置密码邮件
    pub async fn forgot_password(&self, email: &str) -> Result<(), ClientError> {
        let req = ForgotPasswordRequest {
            email: email.to_string(),
        };

        self.client
            .send_unauthenticated(RequestSpec::post(FORGOT_PASSWORD_PATH).json(&req)?)
            .await?
            .error_for_status()
            .map_err(|e| {
                warn!(error = %e, "Forgot password request failed");
                e
            })?;

        Ok(())
    }

    /// 使用邮件中的令牌重置密码
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), ClientError> {
        if token.is_empty() {
            return Err(ClientError::InvalidRequest(
                "Reset token is missing".to_string(),
            ));
        }

        let req = ResetPasswordRequest {
            token: token.to_string(),
            password: password.to_string(),
        };

        self.client
            .send_unauthenticated(RequestSpec::post(RESET_PASSWORD_PATH).json(&req)?)
            .await?
            .error_for_status()?;

        info!("Password reset completed");
        Ok(())
    }
}
