use std::sync::Arc;
use std::time::Duration;

use aps_core::{AccessTokenSource, ApsConfig, ApsError, ApsResult};
use metrics::counter;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

/// 构建共享的 HTTP 客户端
pub fn build_http_client(config: &ApsConfig) -> ApsResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .user_agent(concat!("aps-automation/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApsError::Configuration(format!("创建HTTP客户端失败: {e}")))
}

/// APS 接入点, 路径段经过百分号编码
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    region: String,
}

impl Endpoints {
    pub fn new(config: &ApsConfig) -> ApsResult<Self> {
        let base = Url::parse(config.base_url())
            .map_err(|e| ApsError::Configuration(format!("无效的APS地址 {}: {e}", config.base_url)))?;

        if base.cannot_be_a_base() {
            return Err(ApsError::Configuration(format!(
                "无效的APS地址: {}",
                config.base_url
            )));
        }

        Ok(Self {
            base,
            region: config.region.clone(),
        })
    }

    fn join(&self, prefix: &[&str], segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(prefix).extend(segments);
        }
        url
    }

    pub fn token(&self) -> Url {
        self.join(&["authentication", "v2", "token"], &[])
    }

    /// `/oss/v2/buckets/...`
    pub fn oss(&self, segments: &[&str]) -> Url {
        self.join(&["oss", "v2", "buckets"], segments)
    }

    /// `/da/{region}/v3/...`
    pub fn design_automation(&self, segments: &[&str]) -> Url {
        self.join(&["da", self.region.as_str(), "v3"], segments)
    }

    /// `/modelderivative/v2/designdata/...`
    pub fn model_derivative(&self, segments: &[&str]) -> Url {
        self.join(&["modelderivative", "v2", "designdata"], segments)
    }
}

/// 携带访问令牌的 APS HTTP 客户端
#[derive(Clone)]
pub struct ApsHttp {
    client: reqwest::Client,
    endpoints: Endpoints,
    tokens: Arc<dyn AccessTokenSource>,
}

impl ApsHttp {
    pub fn new(
        client: reqwest::Client,
        endpoints: Endpoints,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            client,
            endpoints,
            tokens,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends with the bearer token attached. A 401 drops the cached token.
    pub async fn send(&self, operation: &'static str, builder: RequestBuilder) -> ApsResult<Response> {
        let bearer = self.tokens.bearer().await?;
        let response = self
            .send_unauthenticated(operation, builder.header(AUTHORIZATION, bearer))
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("{} 返回401, 清除缓存的访问令牌", operation);
            self.tokens.invalidate().await;
        }

        Ok(response)
    }

    /// For pre-signed S3 URLs, which reject an extra `Authorization` header.
    pub async fn send_unauthenticated(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> ApsResult<Response> {
        match builder.send().await {
            Ok(response) => {
                let status = response.status();
                debug!("{} -> HTTP {}", operation, status);
                record_request(operation, status.as_u16());
                Ok(response)
            }
            Err(e) => {
                error!("{} 请求失败: {}", operation, e);
                record_request(operation, 0);
                Err(ApsError::Network(format!("{operation}: {e}")))
            }
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

fn record_request(operation: &'static str, status: u16) {
    counter!(
        "aps_upstream_requests_total",
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Status code and body of a failed response; the body is kept as JSON when it parses.
pub async fn failure_details(response: Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let details = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, details)
}

/// Maps a failed response through `fallback`, except 401 which is always [`ApsError::Auth`].
pub async fn upstream_error(
    response: Response,
    fallback: impl FnOnce(u16, Value) -> ApsError,
) -> ApsError {
    let (status, details) = failure_details(response).await;
    if status == StatusCode::UNAUTHORIZED.as_u16() {
        return ApsError::Auth {
            message: "访问令牌被拒绝".to_string(),
            details: Some(details),
        };
    }
    fallback(status, details)
}

pub fn remote(operation: &str) -> impl FnOnce(u16, Value) -> ApsError + '_ {
    move |status, details| ApsError::Remote {
        operation: operation.to_string(),
        status,
        details,
    }
}

pub fn provisioning(resource: String) -> impl FnOnce(u16, Value) -> ApsError {
    move |status, details| ApsError::Provisioning {
        resource,
        status: Some(status),
        details,
    }
}

pub async fn read_json<T: DeserializeOwned>(response: Response, operation: &str) -> ApsResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApsError::Network(format!("{operation}: 读取响应失败: {e}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}
