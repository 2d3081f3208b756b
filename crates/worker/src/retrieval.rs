use std::sync::Arc;

use tracing::debug;

use aps_core::models::{DownloadTicket, ManifestSummary, ModelEntry, TranslationJob, TranslationRequest};
use aps_core::progress::steps;
use aps_core::{ApsResult, DerivativeService, ObjectStorage, ProgressSink};

const MODEL_EXTENSION: &str = ".rvt";

/// 结果下载与模型查看
pub struct ResultRetrieval {
    storage: Arc<dyn ObjectStorage>,
    derivative: Arc<dyn DerivativeService>,
    expiry_minutes: u32,
}

impl ResultRetrieval {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        derivative: Arc<dyn DerivativeService>,
        expiry_minutes: u32,
    ) -> Self {
        Self {
            storage,
            derivative,
            expiry_minutes,
        }
    }

    /// Time-limited download URL, plus the object size when `with_size` is set.
    pub async fn download(
        &self,
        bucket_key: &str,
        object_key: &str,
        with_size: bool,
        sink: &dyn ProgressSink,
    ) -> ApsResult<DownloadTicket> {
        sink.step(steps::DOWNLOAD);

        let url = self
            .storage
            .signed_download_url(bucket_key, object_key, self.expiry_minutes)
            .await?;

        let size_bytes = if with_size {
            self.storage.object_size(bucket_key, object_key).await?
        } else {
            None
        };

        sink.message(steps::DOWNLOAD, &format!("Download URL for {object_key} ready"));
        Ok(DownloadTicket {
            object_key: object_key.to_string(),
            url,
            expires_in_minutes: self.expiry_minutes,
            size_bytes,
        })
    }

    /// Revit models in the bucket, addressed by URN.
    pub async fn list_models(&self, bucket_key: &str) -> ApsResult<Vec<ModelEntry>> {
        let models: Vec<ModelEntry> = self
            .storage
            .list_objects(bucket_key)
            .await?
            .into_iter()
            .filter(|object| object.object_key.to_lowercase().ends_with(MODEL_EXTENSION))
            .map(|object| ModelEntry {
                urn: object.urn(),
                name: object.object_key,
                size: object.size,
            })
            .collect();

        debug!("存储桶 {} 中有 {} 个模型", bucket_key, models.len());
        Ok(models)
    }

    /// Translation status; `None` when the model was never translated.
    pub async fn model_status(&self, urn: &str) -> ApsResult<Option<ManifestSummary>> {
        self.derivative.manifest(urn).await
    }

    pub async fn translate(
        &self,
        urn: &str,
        root_filename: Option<String>,
        sink: &dyn ProgressSink,
    ) -> ApsResult<TranslationJob> {
        sink.step(steps::TRANSLATE);
        let job = self
            .derivative
            .translate(&TranslationRequest::svf2(urn, root_filename))
            .await?;
        sink.message(steps::TRANSLATE, "Translation started");
        Ok(job)
    }
}
