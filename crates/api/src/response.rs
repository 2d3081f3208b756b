use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// 成功响应
///
/// ```json
/// {
///   "success": true,
///   "operation": "Create OSS Bucket",
///   "message": "Bucket dynamoapp-runs created",
///   "details": { ... },
///   "timestamp": "2024-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct OperationResponse<T> {
    pub success: bool,
    pub operation: &'static str,
    pub message: String,
    pub details: T,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> OperationResponse<T>
where
    T: Serialize,
{
    pub fn new(operation: &'static str, message: impl Into<String>, details: T) -> Self {
        Self {
            success: true,
            operation,
            message: message.into(),
            details,
            timestamp: chrono::Utc::now(),
            status: StatusCode::OK,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T> IntoResponse for OperationResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

pub fn success<T: Serialize>(
    operation: &'static str,
    message: impl Into<String>,
    details: T,
) -> OperationResponse<T> {
    OperationResponse::new(operation, message, details)
}

pub fn created<T: Serialize>(
    operation: &'static str,
    message: impl Into<String>,
    details: T,
) -> OperationResponse<T> {
    OperationResponse::new(operation, message, details).with_status(StatusCode::CREATED)
}

pub fn accepted<T: Serialize>(
    operation: &'static str,
    message: impl Into<String>,
    details: T,
) -> OperationResponse<T> {
    OperationResponse::new(operation, message, details).with_status(StatusCode::ACCEPTED)
}
