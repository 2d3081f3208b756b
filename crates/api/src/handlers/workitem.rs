//! Workitem 端点
//!
//! `POST /api/aps/workitem` 默认等待 workitem 结束; `wait: false` 时立即返回
//! 202, 之后通过 `GET /api/aps/workitem/{id}` 查询。

use std::sync::Arc;

use aps_core::dynamo::{INPUT_MODEL_FILE, RESULT_RVT_FILE};
use aps_core::ApsError;
use aps_worker::{WorkitemOutcome, WorkitemPlan, WorkitemState};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::optional_json;
use crate::{
    error::{aps, ApiError, ApiResult},
    progress::session_from_headers,
    response::{accepted, success},
    routes::AppState,
};

const RUN_OPERATION: &str = "Run Workitem";
const STATUS_OPERATION: &str = "Workitem Status";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunWorkitemRequest {
    pub rvt_file_name: Option<String>,
    pub wait: bool,
}

impl Default for RunWorkitemRequest {
    fn default() -> Self {
        Self {
            rvt_file_name: None,
            wait: true,
        }
    }
}

/// 本地跟踪状态的 JSON 视图
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkitemView {
    pub workitem_id: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<WorkitemOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
}

impl WorkitemView {
    pub fn new(id: &str, state: &WorkitemState) -> Self {
        let mut view = Self {
            workitem_id: id.to_string(),
            state: state.label(),
            status: None,
            attempts: None,
            outcome: None,
            error: None,
            error_details: None,
        };

        match state {
            WorkitemState::Submitted | WorkitemState::Cancelled => {}
            WorkitemState::Polling { status, attempts } => {
                view.status = Some(status.to_string());
                view.attempts = Some(*attempts);
            }
            WorkitemState::Finished(outcome) => {
                view.status = Some(outcome.status.to_string());
                view.attempts = Some(outcome.attempts);
                view.outcome = Some(outcome.clone());
            }
            WorkitemState::Failed(error) => {
                if let ApsError::WorkitemFailed { status, .. } = error.as_ref() {
                    view.status = Some(status.to_string());
                }
                view.error = Some(error.to_string());
                view.error_details = Some(error.details());
            }
        }
        view
    }
}

/// Submits a workitem for the configured activity and bucket.
pub async fn run_workitem(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let request: RunWorkitemRequest = optional_json(&body, RUN_OPERATION)?;
    let input_model = request.rvt_file_name.as_deref().unwrap_or(INPUT_MODEL_FILE);
    let plan = WorkitemPlan::from_config(&state.config, input_model).map_err(aps(RUN_OPERATION))?;

    let sink = state.progress.sink(&session_from_headers(&headers));
    let tracker = &state.services.tracker;
    let id = tracker.start(&plan, sink).await.map_err(aps(RUN_OPERATION))?;

    if !request.wait {
        return Ok(accepted(
            RUN_OPERATION,
            format!("Workitem {id} submitted"),
            json!({
                "workitemId": id,
                "statusUrl": format!("/api/aps/workitem/{id}"),
                "activity_id": plan.activity_id,
                "bucket_name": plan.bucket_key,
            }),
        )
        .into_response());
    }

    match tracker.wait(&id).await.map_err(aps(RUN_OPERATION))? {
        WorkitemState::Finished(outcome) => Ok(success(
            RUN_OPERATION,
            "Workitem completed successfully",
            json!({
                "workitemId": outcome.id,
                "status": outcome.status,
                "resultFile": RESULT_RVT_FILE,
                "results": outcome.results,
                "reportUrl": outcome.report_url,
                "stats": outcome.stats,
                "attempts": outcome.attempts,
                "activity_id": plan.activity_id,
                "bucket_name": plan.bucket_key,
            }),
        )
        .into_response()),
        WorkitemState::Failed(error) => Err(ApiError::Shared {
            operation: RUN_OPERATION,
            source: error,
        }),
        _ => Err(ApiError::Shared {
            operation: RUN_OPERATION,
            source: Arc::new(ApsError::Cancelled),
        }),
    }
}

pub async fn get_workitem(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let current = state
        .services
        .tracker
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found(STATUS_OPERATION, format!("workitem {id} 未被跟踪")))?;

    let view = WorkitemView::new(&id, &current);
    Ok(success(
        STATUS_OPERATION,
        format!("Workitem {id} is {}", view.state),
        view,
    ))
}

/// Stops local polling; the remote workitem is left running.
pub async fn cancel_workitem(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Cancel Workitem";

    let cancelled = state
        .services
        .tracker
        .cancel(&id)
        .await
        .map_err(aps(OPERATION))?;

    let message = if cancelled {
        format!("Polling for workitem {id} cancelled")
    } else {
        format!("Workitem {id} already finished")
    };
    Ok(success(
        OPERATION,
        message,
        json!({ "workitemId": id, "cancelled": cancelled }),
    ))
}

pub async fn resume_workitem(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    const OPERATION: &str = "Resume Workitem";

    let sink = state.progress.sink(&session_from_headers(&headers));
    let current = state
        .services
        .tracker
        .resume(&id, sink)
        .await
        .map_err(aps(OPERATION))?;

    Ok(accepted(
        OPERATION,
        format!("Tracking workitem {id}"),
        WorkitemView::new(&id, &current),
    ))
}
