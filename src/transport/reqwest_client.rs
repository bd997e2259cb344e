//! reqwest 实现的 HTTP 传输层

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use std::sync::Arc;
use tracing::debug;

use super::{ApiResponse, HttpTransport, RequestSpec};
use crate::auth::AccessToken;
use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};

/// 基于 reqwest 的传输层，自带 Cookie 容器
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    /// 根据配置创建传输层
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.api.base_url)
            .map_err(|e| ClientError::Config(format!("Invalid base url: {}", e)))?;

        let jar = Arc::new(Jar::default());

        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.request_timeout())
            .cookie_provider(jar.clone())
            .default_headers(default_headers)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            jar,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 拼接基础地址与相对路径
    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path))
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        spec: &RequestSpec,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(&spec.path)?;
        let request_id = uuid::Uuid::new_v4().to_string();

        let mut builder = self
            .client
            .request(spec.method.clone(), url)
            .header("X-Request-Id", &request_id);

        for (name, value) in &spec.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            builder = builder.header(name, value);
        }

        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose()));
        }

        if let Some(body) = &spec.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!(
            request_id = %request_id,
            method = %spec.method,
            path = %spec.path,
            status = status.as_u16(),
            "Request completed"
        );

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    fn store_cookie(&self, set_cookie: &str) {
        self.jar.add_cookie_str(set_cookie, &self.base_url);
    }

    fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|v| v.to_str().ok().map(|s| s.to_string()))
    }
}
