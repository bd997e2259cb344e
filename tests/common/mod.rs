//! 测试公共模块
//! 提供脚本化的 Mock 传输层和客户端构造函数

#![allow(dead_code)]

use admin_console_client::{
    auth::AccessToken,
    config::ClientConfig,
    error::{StoreError, TransportError},
    models::{Role, SessionUser},
    realtime::EventBus,
    session::{CredentialStore, MemoryStore, Session},
    transport::{ApiResponse, HttpTransport, RequestSpec},
    AuthClient,
};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// 刷新端点的行为
#[derive(Debug, Clone)]
pub enum RefreshBehavior {
    /// 返回 `fresh-{n}`，可选返回 `refresh-{n}`
    Succeed { rotate_refresh_token: bool },
    /// 返回指定状态码
    Fail(u16),
    /// 永不返回
    Hang,
}

/// 记录下来的请求
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

/// 模拟后端 API：
/// - `/auth/refresh` 按 `RefreshBehavior` 响应，并更新有效令牌
/// - `/auth/login` 密码为 "secret" 时成功
/// - `/public` 总是 200
/// - `/always-401` 总是 401
/// - `/status/{code}` 返回对应状态码
/// - `/network-error` 返回传输层错误
/// - 其它路径：令牌有效返回 200，否则 401
pub struct MockTransport {
    valid_token: Mutex<String>,
    refresh_behavior: Mutex<RefreshBehavior>,
    refresh_gate: Mutex<Option<Arc<Semaphore>>>,
    refresh_calls: AtomicUsize,
    unauthorized: AtomicUsize,
    requests: Mutex<Vec<Recorded>>,
    set_cookies: Mutex<Vec<String>>,
    users: Mutex<Vec<SessionUser>>,
}

impl MockTransport {
    pub fn new(valid_token: &str) -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new(valid_token.to_string()),
            refresh_behavior: Mutex::new(RefreshBehavior::Succeed {
                rotate_refresh_token: false,
            }),
            refresh_gate: Mutex::new(None),
            refresh_calls: AtomicUsize::new(0),
            unauthorized: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            set_cookies: Mutex::new(Vec::new()),
            users: Mutex::new(vec![
                user("1", "Root", "ADMIN"),
                user("2", "Maria", "Manager"),
                user("3", "Joao", "user"),
            ]),
        })
    }

    pub fn set_refresh_behavior(&self, behavior: RefreshBehavior) {
        *self.refresh_behavior.lock().unwrap() = behavior;
    }

    /// 刷新请求在拿到许可前阻塞
    pub fn gate_refresh(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.refresh_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// 让当前令牌失效
    pub fn revoke_tokens(&self) {
        *self.valid_token.lock().unwrap() = "revoked".to_string();
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn unauthorized_count(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.set_cookies.lock().unwrap().clone()
    }

    /// 等待未授权响应数达到 n
    pub async fn wait_for_unauthorized(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.unauthorized_count() < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("requests never reached the server");
    }

    async fn refresh(&self) -> ApiResponse {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let gate = self.refresh_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let behavior = self.refresh_behavior.lock().unwrap().clone();
        match behavior {
            RefreshBehavior::Succeed {
                rotate_refresh_token,
            } => {
                let token = format!("fresh-{}", n);
                *self.valid_token.lock().unwrap() = token.clone();
                let body = if rotate_refresh_token {
                    json!({"access_token": token, "refresh_token": format!("refresh-{}", n)})
                } else {
                    json!({"access_token": token})
                };
                ApiResponse::new(StatusCode::OK, body.to_string())
            }
            RefreshBehavior::Fail(code) => ApiResponse::new(
                StatusCode::from_u16(code).unwrap(),
                r#"{"message":"invalid refresh token"}"#,
            ),
            RefreshBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    fn login(&self, body: &Option<serde_json::Value>) -> ApiResponse {
        let body = body.clone().unwrap_or_default();
        if body["password"] != "secret" {
            return ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                r#"{"message":"Invalid credentials"}"#,
            );
        }
        let token = self.valid_token.lock().unwrap().clone();
        let user = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| json!(u.email) == body["email"])
            .cloned();
        match user {
            Some(user) => ApiResponse::new(
                StatusCode::OK,
                json!({"access_token": token, "refresh_token": "login-refresh", "user": user})
                    .to_string(),
            ),
            None => ApiResponse::new(StatusCode::UNAUTHORIZED, "{}"),
        }
    }

    fn resource(&self, spec: &RequestSpec) -> ApiResponse {
        let method = &spec.method;
        if *method == Method::GET && spec.path == "/users" {
            let users = self.users.lock().unwrap().clone();
            return ApiResponse::new(StatusCode::OK, serde_json::to_vec(&users).unwrap());
        }
        if *method == Method::POST && spec.path == "/users" {
            let body = spec.body.clone().unwrap_or_default();
            let created = json!({
                "id": "99",
                "name": body["name"],
                "email": body["email"],
                "role": body["role"].as_str().unwrap_or("user").to_uppercase(),
            });
            return ApiResponse::new(StatusCode::CREATED, created.to_string());
        }
        if *method == Method::PATCH || *method == Method::DELETE {
            return ApiResponse::new(StatusCode::OK, "{}");
        }
        ApiResponse::new(
            StatusCode::OK,
            json!({"path": spec.path, "token": self.valid_token.lock().unwrap().clone()})
                .to_string(),
        )
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        spec: &RequestSpec,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError> {
        let bearer = bearer.map(|t| t.expose().to_string());
        self.requests.lock().unwrap().push(Recorded {
            method: spec.method.clone(),
            path: spec.path.clone(),
            bearer: bearer.clone(),
            body: spec.body.clone(),
        });

        // 让出执行权，模拟网络往返
        tokio::task::yield_now().await;

        match spec.path.as_str() {
            "/auth/refresh" => return Ok(self.refresh().await),
            "/auth/login" => return Ok(self.login(&spec.body)),
            "/auth/forgot-password" | "/auth/reset-password" | "/public" => {
                return Ok(ApiResponse::new(StatusCode::OK, "{}"))
            }
            "/network-error" => {
                return Err(TransportError::Network("connection reset".to_string()))
            }
            "/always-401" => {
                self.unauthorized.fetch_add(1, Ordering::SeqCst);
                return Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "{}"));
            }
            _ => {}
        }

        if let Some(code) = spec.path.strip_prefix("/status/") {
            let status = StatusCode::from_u16(code.parse().unwrap()).unwrap();
            return Ok(ApiResponse::new(status, r#"{"message":"business error"}"#));
        }

        let valid = self.valid_token.lock().unwrap().clone();
        if bearer.as_deref() != Some(valid.as_str()) {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
            return Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "{}"));
        }

        Ok(self.resource(spec))
    }

    fn store_cookie(&self, set_cookie: &str) {
        self.set_cookies.lock().unwrap().push(set_cookie.to_string());
    }

    fn cookie_header(&self) -> Option<String> {
        let last = self.set_cookies.lock().unwrap().last().cloned()?;
        if last.contains("Max-Age=0") {
            return None;
        }
        last.split(';').next().map(|s| s.to_string())
    }
}

pub fn user(id: &str, name: &str, role: &str) -> SessionUser {
    SessionUser {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        role: Role::from(role),
    }
}

/// 创建测试配置
pub fn create_test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.auth.refresh_timeout_secs = 2;
    config.session.redirect_delay_ms = 50;
    config.logging.format = "pretty".to_string();
    config
}

/// 创建客户端，并可选地写入一个已登录会话
pub fn create_client(transport: Arc<MockTransport>, logged_in_as: Option<(&str, SessionUser)>) -> AuthClient {
    let session = Session::new(Arc::new(MemoryStore::new()));
    if let Some((token, user)) = logged_in_as {
        session.begin(token, &user).unwrap();
    }
    AuthClient::new(create_test_config(), transport, session, EventBus::new(16))
}

/// 可以按需让写入或删除失败的存储
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_set: AtomicBool,
    fail_remove: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self) {
        self.fail_set.store(true, Ordering::SeqCst);
    }

    pub fn fail_removes(&self) {
        self.fail_remove.store(true, Ordering::SeqCst);
    }
}

impl CredentialStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("quota exceeded".to_string()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("storage locked".to_string()));
        }
        self.inner.remove(key)
    }
}

/// 使用指定存储创建已登录的客户端
pub fn create_client_with_store(
    transport: Arc<MockTransport>,
    store: Arc<dyn CredentialStore>,
    token: &str,
    user: SessionUser,
) -> AuthClient {
    let session = Session::new(store);
    session.begin(token, &user).unwrap();
    AuthClient::new(create_test_config(), transport, session, EventBus::new(16))
}
