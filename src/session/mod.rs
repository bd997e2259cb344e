//! 会话上下文
//! 登录、刷新、登出时修改；读取失败一律视为"无会话"

pub mod cookie;
pub mod store;

pub use cookie::{
    sets_refresh_cookie, RefreshCookiePolicy, REFRESH_COOKIE_MAX_AGE_SECS, REFRESH_COOKIE_NAME,
};
pub use store::{CredentialStore, FileStore, MemoryStore, TOKEN_KEY, USER_KEY};

use std::sync::Arc;
use tracing::warn;

use crate::auth::AccessToken;
use crate::config::ClientConfig;
use crate::error::StoreError;
use crate::models::SessionUser;

/// 持久化的会话凭据
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// 根据配置选择存储后端
    pub fn from_config(config: &ClientConfig) -> Self {
        let store: Arc<dyn CredentialStore> = match config.session.store.to_lowercase().as_str() {
            "file" => Arc::new(FileStore::new(&config.session.store_path)),
            _ => Arc::new(MemoryStore::new()),
        };
        Self::new(store)
    }

    /// 当前访问令牌；存储不可用时返回 None
    pub fn access_token(&self) -> Option<AccessToken> {
        match self.store.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => Some(AccessToken::new(token)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Credential store unavailable, treating as no session");
                None
            }
        }
    }

    /// 缓存的用户信息；解析失败同样视为无会话
    pub fn current_user(&self) -> Option<SessionUser> {
        let raw = match self.store.get(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Credential store unavailable, treating as no session");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Cached user record is invalid");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// 登录成功后写入令牌与用户信息
    pub fn begin(&self, token: &str, user: &SessionUser) -> Result<(), StoreError> {
        self.store.set(TOKEN_KEY, token)?;
        self.update_user(user)
    }

    /// 刷新成功后覆盖访问令牌
    pub fn replace_access_token(&self, token: &AccessToken) -> Result<(), StoreError> {
        self.store.set(TOKEN_KEY, token.expose())
    }

    pub fn update_user(&self, user: &SessionUser) -> Result<(), StoreError> {
        let raw = serde_json::to_string(user).map_err(|e| StoreError::Corrupted(e.to_string()))?;
        self.store.set(USER_KEY, &raw)
    }

    /// 清除令牌与用户信息；尽力而为，单个键失败不影响另一个
    pub fn clear(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove credential");
            }
        }
    }
}
