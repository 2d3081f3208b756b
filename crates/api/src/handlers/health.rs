use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::routes::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "aps-automation",
        "version": env!("CARGO_PKG_VERSION"),
        "bucket": state.config.storage.bucket_name,
        "activeWorkitems": state.services.tracker.active_count().await,
    }))
}
