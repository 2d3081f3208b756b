use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    error::{ApiError, ApiResult},
    routes::AppState,
};

/// Prometheus 文本格式的指标
pub async fn prometheus_metrics(State(state): State<AppState>) -> ApiResult<Response> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Metrics", "指标导出未启用"))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}
