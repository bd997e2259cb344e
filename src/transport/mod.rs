//! HTTP 传输层抽象
//!
//! 协调器只需要发送（可选携带 Bearer 令牌的）请求，以及修改传输层持有的 Cookie 容器。

mod reqwest_client;

pub use reqwest_client::ReqwestTransport;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::AccessToken;
use crate::error::{ClientError, TransportError};

/// 请求描述，路径相对于配置的基础地址
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// 附加 JSON 请求体
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// 完整读取的响应
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// 非 2xx 响应转换为 `ClientError::Status`
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Status {
                status: self.status.as_u16(),
                body: self.text(),
            })
        }
    }
}

/// HTTP 传输层
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// 向基础地址发出一次请求，总是携带 Cookie 凭据。
    /// 非 2xx 状态作为响应返回，不视为错误。
    async fn send(
        &self,
        spec: &RequestSpec,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError>;

    /// 把 Set-Cookie 写入传输层的 Cookie 容器
    fn store_cookie(&self, set_cookie: &str);

    /// 下一次请求会携带的 Cookie 头
    fn cookie_header(&self) -> Option<String>;
}
