use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::optional_json;
use crate::{
    error::{aps, ApiError, ApiResult},
    progress::session_from_headers,
    response::{accepted, success},
    routes::AppState,
};

pub async fn list_models(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "List Models";
    let bucket_key = &state.config.storage.bucket_name;

    let models = state
        .services
        .retrieval
        .list_models(bucket_key)
        .await
        .map_err(aps(OPERATION))?;

    Ok(success(
        OPERATION,
        format!("Found {} model(s)", models.len()),
        json!({ "bucket_name": bucket_key, "models": models }),
    ))
}

pub async fn model_status(
    State(state): State<AppState>,
    Path(urn): Path<String>,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Model Status";

    let summary = state
        .services
        .retrieval
        .model_status(&urn)
        .await
        .map_err(aps(OPERATION))?
        .ok_or_else(|| ApiError::not_found(OPERATION, format!("模型 {urn} 尚未转换")))?;

    Ok(success(
        OPERATION,
        format!("Translation {} ({})", summary.status, summary.progress),
        summary,
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    /// Main file inside a zipped upload.
    pub root_filename: Option<String>,
}

pub async fn translate_model(
    State(state): State<AppState>,
    Path(urn): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Translate Model";

    let request: TranslateRequest = optional_json(&body, OPERATION)?;
    let sink = state.progress.sink(&session_from_headers(&headers));
    let job = state
        .services
        .retrieval
        .translate(&urn, request.root_filename, sink.as_ref())
        .await
        .map_err(aps(OPERATION))?;

    Ok(accepted(OPERATION, "Translation started", job))
}
