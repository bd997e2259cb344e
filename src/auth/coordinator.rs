//! 认证请求协调器
//!
//! 所有需要认证的请求都经过 [`AuthClient::request`]：
//! 1. 读取当前访问令牌并附加 `Authorization: Bearer ...`（没有令牌就不带）
//! 2. 非 401 响应原样返回，由调用方自行解释
//! 3. 401 时加入（或发起）唯一一次刷新，然后用新令牌重放原请求一次
//! 4. 刷新失败时清除会话、使刷新 Cookie 过期，并把错误传给所有等待者
//!
//! 刷新句柄是一个共享 future，存放在受互斥锁保护的槽位中：
//! 槽位为空时创建，非空时加入，刷新结束时无条件清空。

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::{AccessToken, REFRESH_PATH};
use crate::config::ClientConfig;
use crate::error::{ClientError, RefreshError};
use crate::models::RefreshResponse;
use crate::realtime::{EventBus, SessionEvent};
use crate::session::{sets_refresh_cookie, RefreshCookiePolicy, Session};
use crate::transport::{ApiResponse, HttpTransport, RequestSpec, ReqwestTransport};

type SharedRefresh = Shared<BoxFuture<'static, Result<AccessToken, RefreshError>>>;

/// 正在进行的刷新
struct InFlightRefresh {
    generation: u64,
    handle: SharedRefresh,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    session: Session,
    events: EventBus,
    cookie_policy: RefreshCookiePolicy,
    refresh: Mutex<Option<InFlightRefresh>>,
    generation: AtomicU64,
}

/// 认证 HTTP 客户端
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<Inner>,
}

impl AuthClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        session: Session,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                session,
                events,
                cookie_policy: RefreshCookiePolicy::default(),
                refresh: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// 使用 reqwest 传输层和配置中的存储后端创建客户端
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        let session = Session::from_config(&config);
        Ok(Self::new(config, transport, session, EventBus::default()))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.inner.transport
    }

    pub fn cookie_policy(&self) -> &RefreshCookiePolicy {
        &self.inner.cookie_policy
    }

    /// 当前是否有刷新在进行
    pub fn is_refreshing(&self) -> bool {
        self.inner.slot().is_some()
    }

    /// 发出认证请求
    ///
    /// 返回成功响应、原样的非认证错误响应，或刷新失败错误。
    /// 重放后的请求若仍为 401，同样原样返回，不会再次刷新。
    pub async fn request(&self, spec: RequestSpec) -> Result<ApiResponse, ClientError> {
        let token = self.inner.session.access_token();
        let response = self.inner.transport.send(&spec, token.as_ref()).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!(
            method = %spec.method,
            path = %spec.path,
            had_token = token.is_some(),
            "Request unauthorized, waiting for token refresh"
        );

        let token = self.refreshed_token().await?;
        let retried = self.inner.transport.send(&spec, Some(&token)).await?;

        if retried.is_unauthorized() {
            warn!(
                method = %spec.method,
                path = %spec.path,
                "Request still unauthorized after token refresh"
            );
        }

        Ok(retried)
    }

    /// 不携带访问令牌、不参与刷新的请求（登录、找回密码等）
    pub async fn send_unauthenticated(&self, spec: RequestSpec) -> Result<ApiResponse, ClientError> {
        Ok(self.inner.transport.send(&spec, None).await?)
    }

    /// 等待当前刷新结果；没有刷新在进行时发起一次
    pub async fn refreshed_token(&self) -> Result<AccessToken, RefreshError> {
        Inner::refresh_handle(&self.inner).await
    }
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Option<InFlightRefresh>> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 槽位非空则加入，否则创建新的刷新任务
    fn refresh_handle(this: &Arc<Self>) -> SharedRefresh {
        let mut slot = this.slot();
        if let Some(in_flight) = slot.as_ref() {
            debug!(generation = in_flight.generation, "Joining in-flight token refresh");
            return in_flight.handle.clone();
        }

        let generation = this.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = this.clone();
        let task = tokio::spawn(async move {
            // 无论成功、失败、超时还是 panic，都在结束时清空槽位
            let _guard = SlotGuard {
                inner: inner.clone(),
                generation,
            };
            inner.refresh_session().await
        });

        let handle = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(RefreshError::Aborted(e.to_string())),
            }
        }
        .boxed()
        .shared();

        *slot = Some(InFlightRefresh {
            generation,
            handle: handle.clone(),
        });
        handle
    }

    async fn refresh_session(&self) -> Result<AccessToken, RefreshError> {
        info!("Access token rejected, refreshing session");

        let timeout = self.config.refresh_timeout();
        let outcome = match tokio::time::timeout(timeout, self.call_refresh()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RefreshError::Timeout(timeout.as_secs())),
        };

        match outcome {
            Ok(token) => {
                metrics::counter!("auth_refresh_total", "outcome" => "success").increment(1);
                info!("Access token refreshed");
                self.events.publish(SessionEvent::TokenRefreshed);
                Ok(token)
            }
            Err(e) => {
                metrics::counter!("auth_refresh_total", "outcome" => "failure").increment(1);
                warn!(error = %e, "Token refresh failed, terminating session");
                self.teardown();
                Err(e)
            }
        }
    }

    async fn call_refresh(&self) -> Result<AccessToken, RefreshError> {
        let response = self
            .transport
            .send(&RequestSpec::post(REFRESH_PATH), None)
            .await?;

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status.as_u16(),
            });
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        if body.access_token.is_empty() {
            return Err(RefreshError::InvalidResponse(
                "empty access_token".to_string(),
            ));
        }

        let token = AccessToken::new(body.access_token);
        // 存储不可用时仍然用新令牌重放请求
        if let Err(e) = self.session.replace_access_token(&token) {
            warn!(error = %e, "Failed to persist refreshed access token");
        }

        // 服务端已经通过 Set-Cookie 下发时，Cookie 容器已自动更新
        if let Some(refresh_token) = body.refresh_token.filter(|t| !t.is_empty()) {
            if !sets_refresh_cookie(&response.headers) {
                self.transport
                    .store_cookie(&self.cookie_policy.issue(&refresh_token));
            }
        }

        Ok(token)
    }

    /// 终止会话：清除凭据、让刷新 Cookie 立即过期、通知 UI
    fn teardown(&self) {
        self.session.clear();
        self.transport.store_cookie(&self.cookie_policy.expire());
        self.events.session_expired(
            &self.config.session.login_path,
            self.config.redirect_delay(),
        );
    }
}

/// 刷新任务结束时清空槽位（只清除自己那一代）
struct SlotGuard {
    inner: Arc<Inner>,
    generation: u64,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut slot = self.inner.slot();
        if slot
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == self.generation)
        {
            *slot = None;
        }
    }
}
