//! 刷新令牌 Cookie 策略

use cookie::time::Duration;
use cookie::{Cookie, SameSite};
use reqwest::header::{HeaderMap, SET_COOKIE};

/// 刷新令牌 Cookie 名称
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// 刷新令牌有效期：7 天
pub const REFRESH_COOKIE_MAX_AGE_SECS: i64 = 604_800;

/// 刷新令牌 Cookie 的固定属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCookiePolicy {
    pub name: &'static str,
    pub path: &'static str,
    pub max_age_secs: i64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for RefreshCookiePolicy {
    fn default() -> Self {
        Self {
            name: REFRESH_COOKIE_NAME,
            path: "/",
            max_age_secs: REFRESH_COOKIE_MAX_AGE_SECS,
            http_only: true,
            secure: true,
            same_site: SameSite::Strict,
        }
    }
}

impl RefreshCookiePolicy {
    /// 生成写入新刷新令牌的 Set-Cookie
    pub fn issue(&self, refresh_token: &str) -> String {
        Cookie::build((self.name, refresh_token.to_owned()))
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site)
            .path(self.path)
            .max_age(Duration::seconds(self.max_age_secs))
            .build()
            .to_string()
    }

    /// 生成立即过期的 Set-Cookie
    pub fn expire(&self) -> String {
        Cookie::build(self.name)
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site)
            .path(self.path)
            .removal()
            .build()
            .to_string()
    }
}

/// 响应是否已经通过 Set-Cookie 下发了刷新令牌
///
/// 服务端下发时以服务端为准，客户端不再用响应体里的令牌覆盖。
pub fn sets_refresh_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| {
            Cookie::parse(v.trim())
                .map(|c| c.name() == REFRESH_COOKIE_NAME)
                .unwrap_or(false)
        })
}
