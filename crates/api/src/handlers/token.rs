use aps_core::progress::steps;
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use serde::Serialize;

use crate::{
    error::{aps, ApiResult},
    progress::session_from_headers,
    response::success,
    routes::AppState,
};

const OPERATION: &str = "Get Access Token";
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Serialize)]
pub struct TokenDetails {
    pub access_token: String,
    pub token_length: usize,
    pub expires_in: i64,
    pub scope: String,
    pub token_type: &'static str,
}

/// Fetches (or reuses) the two-legged token and returns a truncated preview.
pub async fn get_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let sink = state.progress.sink(&session_from_headers(&headers));
    sink.step(steps::TOKEN);

    let token = state
        .services
        .tokens
        .access_token()
        .await
        .map_err(aps(OPERATION))?;

    let preview: String = token.access_token.chars().take(PREVIEW_CHARS).collect();
    let details = TokenDetails {
        access_token: format!("{preview}...[truncated for security]"),
        token_length: token.access_token.len(),
        expires_in: token.expires_in(chrono::Utc::now()),
        scope: state.config.aps.scope_string(),
        token_type: "Bearer",
    };

    sink.message(steps::TOKEN, "Access token retrieved");
    Ok(success(OPERATION, "Access token retrieved successfully", details))
}
