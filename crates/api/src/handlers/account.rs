use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use super::optional_json;
use crate::{
    error::{aps, ApiError, ApiResult},
    progress::session_from_headers,
    response::success,
    routes::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct SetNicknameRequest {
    pub nickname: Option<String>,
}

pub async fn get_nickname(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Get Nickname";

    let nickname = state
        .services
        .provisioner
        .nickname()
        .await
        .map_err(aps(OPERATION))?;

    let message = match &nickname {
        Some(_) => "Nickname retrieved successfully",
        None => "No nickname found",
    };
    Ok(success(OPERATION, message, json!({ "nickname": nickname })))
}

/// 设置 Design Automation 昵称, 未指定时使用配置中的昵称
pub async fn set_nickname(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Set Nickname";

    let request: SetNicknameRequest = optional_json(&body, OPERATION)?;
    let nickname = request
        .nickname
        .map(|nickname| nickname.trim().to_string())
        .unwrap_or_else(|| state.config.design_automation.nickname.clone());
    if nickname.is_empty() {
        return Err(ApiError::bad_request(OPERATION, "昵称不能为空"));
    }

    let sink = state.progress.sink(&session_from_headers(&headers));
    state
        .services
        .provisioner
        .set_nickname(&nickname, sink.as_ref())
        .await
        .map_err(aps(OPERATION))?;

    Ok(success(
        OPERATION,
        format!("Nickname set to {nickname}"),
        json!({ "nickname": nickname }),
    ))
}

/// Deletes the Design Automation app with every AppBundle and Activity.
pub async fn clear_account(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Clear DA Resources";

    let deleted = state
        .services
        .provisioner
        .clear_design_automation()
        .await
        .map_err(aps(OPERATION))?;

    let message = if deleted {
        "Design Automation resources cleared successfully"
    } else {
        "No Design Automation resources found to clear"
    };
    Ok(success(OPERATION, message, json!({ "deleted": deleted })))
}
