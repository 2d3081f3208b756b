use aps_core::dynamo::UploadKind;
use aps_core::ApsError;
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{optional_json, MultipartForm};
use crate::{
    error::{aps, ApiError, ApiResult},
    progress::session_from_headers,
    response::success,
    routes::AppState,
};

fn upload_operation(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::Python => "Upload Python Dependencies",
        UploadKind::Rvt => "Upload RVT File",
        UploadKind::Dynamo => "Upload Dynamo File",
        UploadKind::Json => "Upload JSON File",
        UploadKind::Packages => "Upload Dynamo Packages",
    }
}

/// 单文件上传: multipart 字段 `fileType` 与 `file`
///
/// 对象名由文件类型决定, Dynamo 图必须命名为 `run.dyn`。
pub async fn upload_single(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Upload File";

    let mut form = MultipartForm::read(multipart, OPERATION).await?;
    let kind: UploadKind = form
        .field("fileType")
        .ok_or_else(|| ApiError::bad_request(OPERATION, "Missing fileType"))?
        .parse()
        .map_err(aps(OPERATION))?;

    let operation = upload_operation(kind);
    let file = form.take_file(operation, "Please select a file to upload")?;
    let sink = state.progress.sink(&session_from_headers(&headers));
    let bucket_key = &state.config.storage.bucket_name;
    let uploads = &state.services.uploads;

    let result = if kind == UploadKind::Json {
        let text = String::from_utf8(file.bytes).map_err(|e| {
            aps(operation)(ApsError::invalid_format("Invalid JSON content", e.to_string()))
        })?;
        uploads.upload_run_request(bucket_key, &text, sink.as_ref()).await
    } else {
        uploads
            .upload(bucket_key, kind, &file.file_name, file.bytes, sink.as_ref())
            .await
    };
    let stored = result.map_err(aps(operation))?;

    Ok(success(
        operation,
        format!("{} uploaded as {}", file.file_name, stored.object_key),
        json!({
            "fileType": kind,
            "originalName": file.file_name,
            "object": stored,
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonContentRequest {
    pub json_content: Option<Value>,
}

/// Uploads JSON text from the request body as `run.json`.
pub async fn upload_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Upload JSON File";

    let request: JsonContentRequest = optional_json(&body, OPERATION)?;
    let text = match request.json_content {
        None | Some(Value::Null) => {
            return Err(ApiError::bad_request(OPERATION, "No JSON content provided"))
        }
        Some(Value::String(text)) => text,
        Some(other) => serde_json::to_string_pretty(&other)
            .map_err(|e| aps(OPERATION)(ApsError::Serialization(e)))?,
    };

    let sink = state.progress.sink(&session_from_headers(&headers));
    let stored = state
        .services
        .uploads
        .upload_run_request(&state.config.storage.bucket_name, &text, sink.as_ref())
        .await
        .map_err(aps(OPERATION))?;

    Ok(success(
        OPERATION,
        "JSON content uploaded successfully",
        json!({ "fileName": stored.object_key, "object": stored }),
    ))
}

/// 将上传的 `.dyn` 图转换为 `run.json` 并上传
pub async fn convert_dynamo(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Convert Dynamo to JSON";

    let mut form = MultipartForm::read(multipart, OPERATION).await?;
    let graph = form.take_file(OPERATION, "Please select a Dynamo (.dyn) file to convert")?;

    let sink = state.progress.sink(&session_from_headers(&headers));
    let (converted, stored) = state
        .services
        .uploads
        .convert_and_upload(&state.config.storage.bucket_name, &graph.bytes, sink.as_ref())
        .await
        .map_err(aps(OPERATION))?;

    Ok(success(
        OPERATION,
        "Dynamo file converted to run.json successfully",
        json!({
            "originalName": graph.file_name,
            "graph": converted.properties,
            "object": stored,
        }),
    ))
}
