use aps_core::dynamo::{RESULT_JSON_FILE, RESULT_RVT_FILE};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    error::{aps, ApiError, ApiResult},
    progress::session_from_headers,
    response::success,
    routes::AppState,
};

#[derive(Debug, Serialize)]
pub struct DownloadDetails {
    pub file_name: String,
    pub download_url: String,
    pub expires_in_minutes: u32,
    pub bucket_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_mb: Option<String>,
}

/// 生成结果文件的限时下载链接
///
/// `result_json` 对应 `result.json`, `result_rvt` 对应 `result.rvt` (附带文件大小)。
pub async fn download_result(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let (operation, object_key, with_size) = match kind.as_str() {
        "result_json" => ("Download Result JSON", RESULT_JSON_FILE, false),
        "result_rvt" => ("Download Result RVT", RESULT_RVT_FILE, true),
        other => {
            return Err(ApiError::not_found(
                "Download Result",
                format!("未知的结果类型: {other}"),
            ))
        }
    };

    let bucket_key = &state.config.storage.bucket_name;
    let sink = state.progress.sink(&session_from_headers(&headers));
    let ticket = state
        .services
        .retrieval
        .download(bucket_key, object_key, with_size, sink.as_ref())
        .await
        .map_err(aps(operation))?;

    let details = DownloadDetails {
        file_name: ticket.object_key,
        download_url: ticket.url,
        expires_in_minutes: ticket.expires_in_minutes,
        bucket_name: bucket_key.clone(),
        file_size_bytes: ticket.size_bytes,
        file_size_mb: ticket
            .size_bytes
            .map(|bytes| format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))),
    };
    Ok(success(operation, "Download URL generated successfully", details))
}
