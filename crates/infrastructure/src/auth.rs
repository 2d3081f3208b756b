use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};
use url::Url;

use aps_core::models::{Token, TokenResponse};
use aps_core::{AccessTokenSource, ApsConfig, ApsError, ApsResult};

use crate::http::{failure_details, Endpoints};

/// 两腿 OAuth 令牌提供者
///
/// 令牌缓存在内存中直到过期。刷新是单飞的: 并发调用者在刷新锁上排队,
/// 拿到锁后重新检查缓存, 因此同一时刻最多只有一次令牌交换。
pub struct TokenProvider {
    client: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    scope: String,
    cache: RwLock<Option<Token>>,
    refresh_lock: Mutex<()>,
}

impl TokenProvider {
    pub fn new(config: &ApsConfig, client: reqwest::Client) -> ApsResult<Self> {
        let endpoints = Endpoints::new(config)?;
        Ok(Self {
            client,
            token_url: endpoints.token(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope_string(),
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    async fn cached(&self) -> Option<Token> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|token| token.is_valid_at(Utc::now()))
            .cloned()
    }

    async fn fetch(&self) -> ApsResult<Token> {
        info!("从APS获取新的访问令牌");

        let form = [
            ("grant_type", "client_credentials"),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("连接认证服务失败: {}", e);
                ApsError::Auth {
                    message: format!("无法连接认证服务: {e}"),
                    details: None,
                }
            })?;

        if !response.status().is_success() {
            let (status, details) = failure_details(response).await;
            error!("获取访问令牌失败: HTTP {} - {}", status, details);
            return Err(ApsError::Auth {
                message: format!("Could not get authentication token from Autodesk (HTTP {status})"),
                details: Some(details),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| ApsError::Auth {
            message: format!("无法解析令牌响应: {e}"),
            details: None,
        })?;

        debug!("访问令牌有效期 {} 秒", body.expires_in);
        Ok(Token::new(body.access_token, body.expires_in, Utc::now()))
    }
}

#[async_trait]
impl AccessTokenSource for TokenProvider {
    async fn access_token(&self) -> ApsResult<Token> {
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // 等锁期间其他调用者可能已经完成刷新
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let token = self.fetch().await?;
        *self.cache.write().await = Some(token.clone());
        Ok(token)
    }

    async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}
