//! APS REST 客户端
//!
//! 每个服务一个客户端, 共享同一个 `reqwest::Client` 和 [`TokenProvider`]。

pub mod auth;
pub mod design_automation;
pub mod http;
pub mod model_derivative;
pub mod oss;

use std::sync::Arc;

use aps_core::{AccessTokenSource, ApsConfig, ApsResult};

pub use auth::TokenProvider;
pub use design_automation::DesignAutomationClient;
pub use http::{build_http_client, ApsHttp, Endpoints};
pub use model_derivative::DerivativeClient;
pub use oss::OssClient;

/// All APS clients wired to one token provider.
#[derive(Clone)]
pub struct ApsClients {
    pub tokens: Arc<TokenProvider>,
    pub oss: Arc<OssClient>,
    pub design_automation: Arc<DesignAutomationClient>,
    pub derivative: Arc<DerivativeClient>,
}

impl ApsClients {
    pub fn new(config: &ApsConfig) -> ApsResult<Self> {
        let client = build_http_client(config)?;
        let endpoints = Endpoints::new(config)?;
        let tokens = Arc::new(TokenProvider::new(config, client.clone())?);

        let token_source: Arc<dyn AccessTokenSource> = tokens.clone();
        let http = ApsHttp::new(client, endpoints, token_source);

        Ok(Self {
            tokens,
            oss: Arc::new(OssClient::new(http.clone())),
            design_automation: Arc::new(DesignAutomationClient::new(http.clone())),
            derivative: Arc::new(DerivativeClient::new(http)),
        })
    }
}
