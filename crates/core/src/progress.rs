use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Step names used in progress messages.
pub mod steps {
    pub const TOKEN: &str = "GET TOKEN";
    pub const NICKNAME: &str = "NICKNAME";
    pub const CREATE_BUCKET: &str = "CREATE BUCKET";
    pub const DELETE_BUCKET: &str = "DELETE BUCKET";
    pub const APPBUNDLE: &str = "UPLOAD APPBUNDLE";
    pub const ACTIVITY: &str = "CREATE ACTIVITY";
    pub const UPLOAD: &str = "UPLOAD FILE";
    pub const CONVERT: &str = "CONVERT DYNAMO";
    pub const WORKITEM: &str = "CREATE WORKITEM";
    pub const STATUS: &str = "STATUS";
    pub const DOWNLOAD: &str = "DOWNLOAD RESULT";
    pub const TRANSLATE: &str = "TRANSLATE MODEL";
    pub const ERROR: &str = "ERROR";
}

/// 推送给浏览器的进度事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub step: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(step: &str, message: &str) -> Self {
        Self {
            step: step.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// `--- Step: <STEP> ---` banner that opens a step.
    pub fn banner(step: &str) -> Self {
        Self::new(step, &format!("--- Step: {step} ---"))
    }
}

/// 进度输出通道
///
/// 发送失败 (例如浏览器已断开) 不影响工作流本身。
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);

    fn step(&self, step: &str) {
        self.emit(ProgressEvent::banner(step));
    }

    fn message(&self, step: &str, message: &str) {
        self.emit(ProgressEvent::new(step, message));
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for Arc<T> {
    fn emit(&self, event: ProgressEvent) {
        (**self).emit(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn emit(&self, event: ProgressEvent) {
        info!(step = %event.step, "{}", event.message);
    }
}
