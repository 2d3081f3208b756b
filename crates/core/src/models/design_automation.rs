use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 带版本与别名的 Design Automation 定义类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    AppBundle,
    Activity,
}

impl DefinitionKind {
    /// Collection segment under `/da/{region}/v3/`.
    pub fn collection(&self) -> &'static str {
        match self {
            DefinitionKind::AppBundle => "appbundles",
            DefinitionKind::Activity => "activities",
        }
    }
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitionKind::AppBundle => f.write_str("AppBundle"),
            DefinitionKind::Activity => f.write_str("Activity"),
        }
    }
}

/// Unqualified id plus the version body of an AppBundle or Activity.
///
/// The create call carries `id`; new versions of an existing id must not.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionSpec {
    pub id: String,
    pub body: serde_json::Map<String, Value>,
}

impl DefinitionSpec {
    pub fn create_body(&self) -> Value {
        let mut body = self.body.clone();
        body.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(body)
    }

    pub fn version_body(&self) -> Value {
        let mut body = self.body.clone();
        body.remove("id");
        Value::Object(body)
    }
}

/// 创建定义或新版本后的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionVersion {
    #[serde(default)]
    pub id: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_parameters: Option<UploadParameters>,
}

/// AppBundle 包上传的预签名表单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadParameters {
    #[serde(rename = "endpointURL")]
    pub endpoint_url: String,
    #[serde(rename = "formData", default)]
    pub form_data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub id: String,
    pub version: u32,
}

/// `PATCH .../aliases/{alias}` 请求体
#[derive(Debug, Clone, Serialize)]
pub struct AliasUpdate {
    pub version: u32,
}

/// Definition version plus the alias that now points at it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedDefinition {
    pub kind: DefinitionKind,
    /// Fully qualified `<nickname>.<id>+<alias>`.
    pub qualified_id: String,
    pub version: u32,
    pub alias: String,
    /// `false` when an earlier version already existed and a new one was added.
    pub created: bool,
}

/// `GET /appbundles`, `GET /activities` 分页响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdPage {
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(rename = "paginationToken", default)]
    pub pagination_token: Option<String>,
}

/// Workitem 状态
///
/// 未知字符串保留在 [`WorkitemStatus::Other`] 中。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkitemStatus {
    Pending,
    InProgress,
    Success,
    Cancelled,
    FailedLimitDataSize,
    FailedLimitProcessingTime,
    FailedDownload,
    FailedInstructions,
    FailedUpload,
    FailedUploadOptional,
    Other(String),
}

impl WorkitemStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkitemStatus::Pending => "pending",
            WorkitemStatus::InProgress => "inprogress",
            WorkitemStatus::Success => "success",
            WorkitemStatus::Cancelled => "cancelled",
            WorkitemStatus::FailedLimitDataSize => "failedLimitDataSize",
            WorkitemStatus::FailedLimitProcessingTime => "failedLimitProcessingTime",
            WorkitemStatus::FailedDownload => "failedDownload",
            WorkitemStatus::FailedInstructions => "failedInstructions",
            WorkitemStatus::FailedUpload => "failedUpload",
            WorkitemStatus::FailedUploadOptional => "failedUploadOptional",
            WorkitemStatus::Other(status) => status,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkitemStatus::Pending | WorkitemStatus::InProgress)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkitemStatus::Success)
    }
}

impl From<String> for WorkitemStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "pending" => WorkitemStatus::Pending,
            "inprogress" => WorkitemStatus::InProgress,
            "success" => WorkitemStatus::Success,
            "cancelled" => WorkitemStatus::Cancelled,
            "failedLimitDataSize" => WorkitemStatus::FailedLimitDataSize,
            "failedLimitProcessingTime" => WorkitemStatus::FailedLimitProcessingTime,
            "failedDownload" => WorkitemStatus::FailedDownload,
            "failedInstructions" => WorkitemStatus::FailedInstructions,
            "failedUpload" => WorkitemStatus::FailedUpload,
            "failedUploadOptional" => WorkitemStatus::FailedUploadOptional,
            _ => WorkitemStatus::Other(status),
        }
    }
}

impl From<&str> for WorkitemStatus {
    fn from(status: &str) -> Self {
        WorkitemStatus::from(status.to_string())
    }
}

impl From<WorkitemStatus> for String {
    fn from(status: WorkitemStatus) -> Self {
        match status {
            WorkitemStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for WorkitemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Put,
}

/// Workitem 参数槽位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkitemArgument {
    pub url: String,
    pub verb: Verb,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl WorkitemArgument {
    pub fn new(url: impl Into<String>, verb: Verb, bearer: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), bearer.to_string());
        Self {
            url: url.into(),
            verb,
            headers,
        }
    }
}

/// `POST /workitems` 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkitemRequest {
    pub activity_id: String,
    pub arguments: BTreeMap<String, WorkitemArgument>,
}

/// `POST /workitems` 与 `GET /workitems/{id}` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkitemInfo {
    pub id: String,
    pub status: WorkitemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
}

/// `PATCH /forgeapps/me` 请求体
#[derive(Debug, Clone, Serialize)]
pub struct NicknameRequest<'a> {
    pub nickname: &'a str,
}
