use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tracing::info;

use aps_core::models::{Manifest, ManifestSummary, TranslationJob, TranslationRequest};
use aps_core::{ApsResult, DerivativeService};

use crate::http::{read_json, remote, upstream_error, ApsHttp};

/// Model Derivative 客户端
#[derive(Clone)]
pub struct DerivativeClient {
    http: ApsHttp,
}

impl DerivativeClient {
    pub fn new(http: ApsHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DerivativeService for DerivativeClient {
    async fn translate(&self, request: &TranslationRequest) -> ApsResult<TranslationJob> {
        let url = self.http.endpoints().model_derivative(&["job"]);
        let builder = self.http.request(Method::POST, url).json(request);

        let response = self.http.send("md.translate", builder).await?;

        if !response.status().is_success() {
            return Err(upstream_error(response, remote("md.translate")).await);
        }

        let job: TranslationJob = read_json(response, "md.translate").await?;
        info!("模型转换已提交: {}", request.input.urn);
        Ok(job)
    }

    async fn manifest(&self, urn: &str) -> ApsResult<Option<ManifestSummary>> {
        let url = self.http.endpoints().model_derivative(&[urn, "manifest"]);
        let response = self
            .http
            .send("md.manifest", self.http.request(Method::GET, url))
            .await?;

        match response.status() {
            status if status.is_success() => {
                let manifest: Manifest = read_json(response, "md.manifest").await?;
                Ok(Some(manifest.into()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(upstream_error(response, remote("md.manifest")).await),
        }
    }
}
