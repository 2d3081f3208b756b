use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ApsError;
use crate::urn::urnify;

/// 存储桶保留策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketPolicy {
    /// 24 小时后自动删除对象
    #[default]
    Transient,
    /// 30 天
    Temporary,
    Persistent,
}

impl BucketPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketPolicy::Transient => "transient",
            BucketPolicy::Temporary => "temporary",
            BucketPolicy::Persistent => "persistent",
        }
    }
}

impl std::fmt::Display for BucketPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketPolicy {
    type Err = ApsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transient" => Ok(BucketPolicy::Transient),
            "temporary" => Ok(BucketPolicy::Temporary),
            "persistent" => Ok(BucketPolicy::Persistent),
            _ => Err(ApsError::BadRequest(format!("未知的存储桶策略: {s}"))),
        }
    }
}

/// 存储桶详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub bucket_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<i64>,
    pub policy_key: BucketPolicy,
}

/// `POST /buckets` 请求体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketRequest<'a> {
    pub bucket_key: &'a str,
    pub policy_key: BucketPolicy,
}

/// Result of an idempotent bucket creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsuredBucket {
    pub bucket_key: String,
    pub policy: BucketPolicy,
    /// `false` when the bucket already existed.
    pub created: bool,
}

/// `GET .../signeds3upload` 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    pub upload_key: String,
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_expiration: Option<i64>,
}

/// `POST .../signeds3upload` 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompletion {
    pub bucket_key: String,
    pub object_id: String,
    pub object_key: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// 已上传到 OSS 的对象
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket_key: String,
    pub object_key: String,
    pub object_id: String,
    pub size: Option<u64>,
    pub urn: String,
}

impl From<UploadCompletion> for StoredObject {
    fn from(completion: UploadCompletion) -> Self {
        let urn = urnify(&completion.object_id);
        Self {
            bucket_key: completion.bucket_key,
            object_key: completion.object_key,
            object_id: completion.object_id,
            size: completion.size,
            urn,
        }
    }
}

/// 对象列表中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub bucket_key: String,
    pub object_key: String,
    pub object_id: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

impl ObjectSummary {
    pub fn urn(&self) -> String {
        urnify(&self.object_id)
    }
}

/// `GET /buckets/{bucket}/objects` 分页响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectPage {
    #[serde(default)]
    pub items: Vec<ObjectSummary>,
    /// 下一页的完整 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// `GET .../signeds3download` 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedDownload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// 带有效期的下载链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTicket {
    pub object_key: String,
    pub url: String,
    pub expires_in_minutes: u32,
    pub size_bytes: Option<u64>,
}

/// 可用于查看器的模型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub name: String,
    pub urn: String,
    pub size: Option<u64>,
}

/// Outcome of emptying and deleting a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub bucket_key: String,
    pub objects_deleted: usize,
    pub objects_failed: usize,
    pub bucket_deleted: bool,
    /// Fresh bucket name to use when the old one could not be removed.
    pub suggested_bucket_name: Option<String>,
}
