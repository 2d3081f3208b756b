use async_trait::async_trait;

use crate::models::{ManifestSummary, TranslationJob, TranslationRequest};
use crate::ApsResult;

/// Model Derivative 接口
#[async_trait]
pub trait DerivativeService: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> ApsResult<TranslationJob>;

    /// `None` while no translation has been requested for the URN.
    async fn manifest(&self, urn: &str) -> ApsResult<Option<ManifestSummary>>;
}
