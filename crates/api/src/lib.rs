//! # APS Automation API
//!
//! 基于 Axum 的 HTTP 接口, 把 APS 工作流的每一步暴露给浏览器:
//!
//! - 令牌、昵称与 Design Automation 账户
//! - 存储桶的创建、删除与清理
//! - AppBundle / Activity 发布
//! - 文件上传与 Dynamo 图转换
//! - Workitem 提交、查询、取消与恢复
//! - 结果下载与模型转换
//! - 按会话推送的进度事件 (SSE)
//!
//! 成功响应统一为 `{success, operation, message, details, timestamp}`,
//! 失败响应为 `{success: false, operation, error, details, timestamp}`。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod progress;
pub mod response;
pub mod routes;

use axum::{extract::DefaultBodyLimit, Router};
use tower::ServiceBuilder;

pub use error::{ApiError, ApiResult};
pub use progress::ProgressHub;
pub use routes::{create_routes, AppState};

use crate::middleware::{cors_layer, request_logging, trace_layer};

/// Router with tracing, request logging, upload size limit and, when enabled, CORS.
pub fn create_app(state: AppState) -> Router {
    let api = state.config.api.clone();
    let router = create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(DefaultBodyLimit::max(api.max_upload_bytes()))
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if api.cors_enabled {
        router.layer(cors_layer(&api))
    } else {
        router
    }
}
