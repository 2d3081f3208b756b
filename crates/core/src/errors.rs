use serde_json::Value;
use thiserror::Error;

use crate::models::WorkitemStatus;

/// APS 工作流错误类型定义
#[derive(Debug, Error)]
pub enum ApsError {
    #[error("认证失败: {message}")]
    Auth {
        message: String,
        details: Option<Value>,
    },

    #[error("资源配置失败 [{resource}]: HTTP {status:?}")]
    Provisioning {
        resource: String,
        status: Option<u16>,
        details: Value,
    },

    #[error("对象上传失败 [{object}] 步骤 {step}")]
    Upload {
        object: String,
        step: UploadStep,
        details: Value,
    },

    #[error("Workitem {id} 轮询超时 (已轮询 {attempts} 次)")]
    WorkitemTimeout { id: String, attempts: u32 },

    #[error("Workitem {id} 执行失败, 状态: {status}")]
    WorkitemFailed {
        id: String,
        status: WorkitemStatus,
        details: Value,
    },

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("资源冲突: {resource}")]
    Conflict { resource: String, details: Value },

    #[error("无效的格式: {message}")]
    InvalidFormat { message: String, details: String },

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("远程服务错误 [{operation}]: HTTP {status}")]
    Remote {
        operation: String,
        status: u16,
        details: Value,
    },

    #[error("网络错误: {0}")]
    Network(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("操作已取消")]
    Cancelled,

    #[error("内部错误: {0}")]
    Internal(String),
}

/// Step of the three-step signed upload that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    RequestSignedUrl,
    PutBytes,
    Complete,
}

impl std::fmt::Display for UploadStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UploadStep::RequestSignedUrl => "request-signed-url",
            UploadStep::PutBytes => "put-bytes",
            UploadStep::Complete => "complete",
        };
        f.write_str(name)
    }
}

impl ApsError {
    pub fn auth(message: impl Into<String>) -> Self {
        ApsError::Auth {
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid_format(message: impl Into<String>, details: impl Into<String>) -> Self {
        ApsError::InvalidFormat {
            message: message.into(),
            details: details.into(),
        }
    }

    /// Upstream payload or extra context to surface next to the message.
    pub fn details(&self) -> Value {
        match self {
            ApsError::Auth { details, .. } => details.clone().unwrap_or(Value::Null),
            ApsError::Provisioning { details, .. }
            | ApsError::Upload { details, .. }
            | ApsError::WorkitemFailed { details, .. }
            | ApsError::Conflict { details, .. }
            | ApsError::Remote { details, .. } => details.clone(),
            ApsError::InvalidFormat { details, .. } => Value::String(details.clone()),
            ApsError::WorkitemTimeout { id, attempts } => serde_json::json!({
                "workitemId": id,
                "attempts": attempts,
            }),
            other => Value::String(other.to_string()),
        }
    }

    /// HTTP status reported by APS, when the failure came from an upstream response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ApsError::Provisioning { status, .. } => *status,
            ApsError::Remote { status, .. } => Some(*status),
            ApsError::Conflict { .. } => Some(409),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApsError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApsError::Conflict { .. })
    }
}

/// 统一的Result类型
pub type ApsResult<T> = std::result::Result<T, ApsError>;
