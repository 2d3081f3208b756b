use aps_core::progress::steps;
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use serde_json::json;

use crate::{
    error::{aps, ApiError, ApiResult},
    progress::session_from_headers,
    response::{created, success},
    routes::AppState,
};

pub async fn get_bucket(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Get OSS Bucket";
    let bucket_key = &state.config.storage.bucket_name;

    let bucket = state
        .services
        .provisioner
        .bucket(bucket_key)
        .await
        .map_err(aps(OPERATION))?
        .ok_or_else(|| ApiError::not_found(OPERATION, format!("存储桶 {bucket_key} 不存在")))?;

    Ok(success(OPERATION, "Bucket details retrieved successfully", bucket))
}

/// 创建配置的存储桶, 已存在时返回 200
pub async fn create_bucket(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Create OSS Bucket";
    let bucket_key = &state.config.storage.bucket_name;
    let sink = state.progress.sink(&session_from_headers(&headers));

    sink.step(steps::CREATE_BUCKET);
    let ensured = state
        .services
        .provisioner
        .ensure_bucket(bucket_key)
        .await
        .map_err(aps(OPERATION))?;

    if ensured.created {
        let message = format!("Bucket {bucket_key} created");
        sink.message(steps::CREATE_BUCKET, &message);
        Ok(created(OPERATION, message, ensured))
    } else {
        let message = format!("Bucket {bucket_key} already exists");
        sink.message(steps::CREATE_BUCKET, &message);
        Ok(success(OPERATION, message, ensured))
    }
}

pub async fn delete_bucket(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Clear OSS Bucket";
    let bucket_key = &state.config.storage.bucket_name;
    let sink = state.progress.sink(&session_from_headers(&headers));

    let deleted = state
        .services
        .provisioner
        .delete_bucket(bucket_key, sink.as_ref())
        .await
        .map_err(aps(OPERATION))?;

    let message = if deleted {
        "OSS Bucket cleared successfully"
    } else {
        "No OSS Bucket found to clear"
    };
    Ok(success(
        OPERATION,
        message,
        json!({ "bucket_name": bucket_key, "deleted": deleted }),
    ))
}

/// Empties and deletes the bucket, suggesting a new name if it cannot go.
pub async fn purge_bucket(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Smart Bucket Cleanup";
    let bucket_key = &state.config.storage.bucket_name;
    let sink = state.progress.sink(&session_from_headers(&headers));

    let report = state
        .services
        .provisioner
        .purge_bucket(bucket_key, sink.as_ref())
        .await
        .map_err(aps(OPERATION))?;

    let message = match (&report.suggested_bucket_name, report.bucket_deleted) {
        (Some(name), _) => format!(
            "Bucket could not be deleted; set APS_BUCKET_NAME={name} to continue with a fresh bucket"
        ),
        (None, true) => format!("Bucket {bucket_key} emptied and deleted"),
        (None, false) => format!("Bucket {bucket_key} does not exist"),
    };
    Ok(success(OPERATION, message, report))
}
