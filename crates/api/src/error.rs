use std::sync::Arc;

use aps_core::ApsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

/// API错误类型
///
/// 每个错误都带有出错的操作名, 例如 `Create OSS Bucket`。
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{operation}: {source}")]
    Aps {
        operation: &'static str,
        source: ApsError,
    },

    #[error("{operation}: {source}")]
    Shared {
        operation: &'static str,
        source: Arc<ApsError>,
    },

    #[error("请求参数错误: {message}")]
    BadRequest {
        operation: &'static str,
        message: String,
    },

    #[error("资源未找到: {message}")]
    NotFound {
        operation: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn bad_request(operation: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            operation,
            message: message.into(),
        }
    }

    pub fn not_found(operation: &'static str, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            operation,
            message: message.into(),
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            ApiError::Aps { operation, .. }
            | ApiError::Shared { operation, .. }
            | ApiError::BadRequest { operation, .. }
            | ApiError::NotFound { operation, .. } => operation,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Aps { source, .. } => status_for(source),
            ApiError::Shared { source, .. } => status_for(source),
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    fn message_and_details(&self) -> (String, Value) {
        match self {
            ApiError::Aps { source, .. } => (source.to_string(), source.details()),
            ApiError::Shared { source, .. } => (source.to_string(), source.details()),
            ApiError::BadRequest { message, .. } | ApiError::NotFound { message, .. } => {
                (message.clone(), Value::Null)
            }
        }
    }
}

/// Adapter for `map_err` that tags an [`ApsError`] with the operation name.
pub fn aps(operation: &'static str) -> impl FnOnce(ApsError) -> ApiError {
    move |source| ApiError::Aps { operation, source }
}

fn status_for(error: &ApsError) -> StatusCode {
    match error {
        ApsError::BadRequest(_) | ApsError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,
        ApsError::Auth { .. } => StatusCode::UNAUTHORIZED,
        ApsError::NotFound(_) => StatusCode::NOT_FOUND,
        ApsError::Conflict { .. } => StatusCode::CONFLICT,
        ApsError::WorkitemTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ApsError::Remote { .. }
        | ApsError::WorkitemFailed { .. }
        | ApsError::Provisioning { .. }
        | ApsError::Upload { .. }
        | ApsError::Network(_) => StatusCode::BAD_GATEWAY,
        ApsError::Serialization(_)
        | ApsError::Configuration(_)
        | ApsError::Cancelled
        | ApsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, details) = self.message_and_details();

        if status.is_server_error() {
            error!("{} 失败: {}", self.operation(), message);
        } else {
            warn!("{} 失败: {}", self.operation(), message);
        }

        let body = Json(json!({
            "success": false,
            "operation": self.operation(),
            "error": message,
            "details": details,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
