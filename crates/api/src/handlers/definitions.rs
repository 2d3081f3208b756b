use aps_core::models::DefinitionKind;
use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde_json::json;

use super::MultipartForm;
use crate::{
    error::{aps, ApiResult},
    progress::session_from_headers,
    response::{created, success},
    routes::AppState,
};

async fn list(
    state: &AppState,
    kind: DefinitionKind,
    operation: &'static str,
) -> ApiResult<impl IntoResponse> {
    let ids = state
        .services
        .provisioner
        .list_definitions(kind)
        .await
        .map_err(aps(operation))?;

    Ok(success(
        operation,
        format!("Found {} {}(s)", ids.len(), kind),
        json!({
            "nickname": state.config.design_automation.nickname,
            "ids": ids,
        }),
    ))
}

pub async fn list_appbundles(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    list(&state, DefinitionKind::AppBundle, "List AppBundles").await
}

pub async fn list_activities(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    list(&state, DefinitionKind::Activity, "List Activities").await
}

/// 上传 AppBundle 包 (multipart `file` 字段, zip 格式)
pub async fn upload_appbundle(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Upload AppBundle";

    let mut form = MultipartForm::read(multipart, OPERATION).await?;
    let package = form.take_file(OPERATION, "Please select the AppBundle zip package")?;

    let sink = state.progress.sink(&session_from_headers(&headers));
    let published = state
        .services
        .provisioner
        .publish_appbundle(package.bytes, sink.as_ref())
        .await
        .map_err(aps(OPERATION))?;

    Ok(created(
        OPERATION,
        format!(
            "AppBundle {} version {} published",
            published.qualified_id, published.version
        ),
        published,
    ))
}

pub async fn create_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Create Activity";

    let sink = state.progress.sink(&session_from_headers(&headers));
    let published = state
        .services
        .provisioner
        .publish_activity(sink.as_ref())
        .await
        .map_err(aps(OPERATION))?;

    Ok(created(
        OPERATION,
        format!(
            "Activity {} version {} published",
            published.qualified_id, published.version
        ),
        published,
    ))
}
