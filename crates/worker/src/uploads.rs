use std::sync::Arc;

use tracing::{info, warn};

use aps_core::dynamo::{convert_graph, ConvertedGraph, UploadKind, RUN_REQUEST_FILE};
use aps_core::models::{StoredObject, TranslationRequest};
use aps_core::progress::steps;
use aps_core::{ApsError, ApsResult, DerivativeService, ObjectStorage, ProgressSink};

/// 工作流输入文件的上传服务
pub struct UploadService {
    storage: Arc<dyn ObjectStorage>,
    derivative: Arc<dyn DerivativeService>,
}

impl UploadService {
    pub fn new(storage: Arc<dyn ObjectStorage>, derivative: Arc<dyn DerivativeService>) -> Self {
        Self {
            storage,
            derivative,
        }
    }

    /// Uploads one workflow file under the object name its kind dictates.
    ///
    /// Name checks happen before any network call. Revit models are queued
    /// for viewer translation afterwards; a failed translation only logs.
    pub async fn upload(
        &self,
        bucket_key: &str,
        kind: UploadKind,
        original_name: &str,
        bytes: Vec<u8>,
        sink: &dyn ProgressSink,
    ) -> ApsResult<StoredObject> {
        let target = kind.target(original_name)?;

        sink.step(steps::UPLOAD);
        sink.message(
            steps::UPLOAD,
            &format!("Uploading {} as {}", original_name, target.object_key),
        );

        let stored = self
            .storage
            .upload_object(bucket_key, &target.object_key, bytes, target.content_type)
            .await?;

        sink.message(steps::UPLOAD, &format!("{} uploaded", stored.object_key));

        if kind == UploadKind::Rvt {
            self.start_translation(&stored, sink).await;
        }

        Ok(stored)
    }

    /// Uploads a run request given as JSON text.
    pub async fn upload_run_request(
        &self,
        bucket_key: &str,
        json_text: &str,
        sink: &dyn ProgressSink,
    ) -> ApsResult<StoredObject> {
        if let Err(e) = serde_json::from_str::<serde_json::Value>(json_text) {
            return Err(ApsError::invalid_format("Invalid JSON content", e.to_string()));
        }

        self.upload(
            bucket_key,
            UploadKind::Json,
            RUN_REQUEST_FILE,
            json_text.as_bytes().to_vec(),
            sink,
        )
        .await
    }

    /// Converts a Dynamo graph into a run request and uploads it as `run.json`.
    pub async fn convert_and_upload(
        &self,
        bucket_key: &str,
        graph: &[u8],
        sink: &dyn ProgressSink,
    ) -> ApsResult<(ConvertedGraph, StoredObject)> {
        sink.step(steps::CONVERT);
        let converted = convert_graph(graph)?;
        sink.message(
            steps::CONVERT,
            &format!(
                "Graph {} converted ({} nodes)",
                converted.properties.name, converted.properties.nodes_count
            ),
        );

        let json_text = converted.run_request_json()?;
        let stored = self.upload_run_request(bucket_key, &json_text, sink).await?;
        Ok((converted, stored))
    }

    async fn start_translation(&self, stored: &StoredObject, sink: &dyn ProgressSink) {
        sink.step(steps::TRANSLATE);
        let request = TranslationRequest::svf2(stored.urn.clone(), None);
        match self.derivative.translate(&request).await {
            Ok(_) => {
                info!("{} 已提交转换 (urn {})", stored.object_key, stored.urn);
                sink.message(steps::TRANSLATE, "Translation started");
            }
            Err(e) => {
                warn!("{} 转换提交失败: {}", stored.object_key, e);
                sink.message(steps::TRANSLATE, &format!("Translation not started: {e}"));
            }
        }
    }
}
