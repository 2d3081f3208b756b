use std::sync::Arc;

use aps_core::AppConfig;
use aps_worker::ApsServices;
use axum::{
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{
    account::{clear_account, get_nickname, set_nickname},
    bucket::{create_bucket, delete_bucket, get_bucket, purge_bucket},
    definitions::{create_activity, list_activities, list_appbundles, upload_appbundle},
    download::download_result,
    events::progress_events,
    health::health_check,
    metrics::prometheus_metrics,
    models::{list_models, model_status, translate_model},
    token::get_token,
    upload::{convert_dynamo, upload_json, upload_single},
    workitem::{cancel_workitem, get_workitem, resume_workitem, run_workitem},
};
use crate::progress::ProgressHub;

#[derive(Clone)]
pub struct AppState {
    pub services: ApsServices,
    pub config: Arc<AppConfig>,
    pub progress: Arc<ProgressHub>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(services: ApsServices, config: Arc<AppConfig>) -> Self {
        Self {
            services,
            config,
            progress: Arc::new(ProgressHub::new()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn create_routes(state: AppState) -> Router {
    let metrics_endpoint = state.config.observability.metrics_endpoint.clone();

    Router::new()
        // 健康检查与指标
        .route("/health", get(health_check))
        .route(&metrics_endpoint, get(prometheus_metrics))
        // 认证与账户
        .route("/api/aps/token", post(get_token))
        .route("/api/aps/nickname", get(get_nickname).post(set_nickname))
        .route("/api/aps/account", delete(clear_account))
        // 存储桶
        .route(
            "/api/aps/bucket",
            get(get_bucket).post(create_bucket).delete(delete_bucket),
        )
        .route("/api/aps/bucket/purge", post(purge_bucket))
        // AppBundle 与 Activity
        .route(
            "/api/aps/appbundle",
            get(list_appbundles).post(upload_appbundle),
        )
        .route("/api/aps/activity", get(list_activities).post(create_activity))
        // Workitem
        .route("/api/aps/workitem", post(run_workitem))
        .route(
            "/api/aps/workitem/{id}",
            get(get_workitem).delete(cancel_workitem),
        )
        .route("/api/aps/workitem/{id}/resume", post(resume_workitem))
        // 上传与转换
        .route("/api/aps/upload/single", post(upload_single))
        .route("/api/aps/upload/json", post(upload_json))
        .route("/api/aps/dynamo/convert", post(convert_dynamo))
        // 结果与模型
        .route("/api/aps/download/{kind}", get(download_result))
        .route("/api/models", get(list_models))
        .route("/api/models/{urn}/status", get(model_status))
        .route("/api/models/{urn}/translate", post(translate_model))
        // 进度事件
        .route("/api/aps/events/{session}", get(progress_events))
        .with_state(state)
}
