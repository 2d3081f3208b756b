//! OSS 对象存储接口
//!
//! 存在性探测 (`bucket_details`, `object_exists`, `delete_*`) 把 404 视为正常结果,
//! 其余失败通过 [`crate::ApsError`] 返回。

use async_trait::async_trait;

use crate::models::{Bucket, BucketPolicy, ObjectSummary, StoredObject};
use crate::ApsResult;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// `None` when the bucket does not exist.
    async fn bucket_details(&self, bucket_key: &str) -> ApsResult<Option<Bucket>>;

    /// 409 is reported as [`crate::ApsError::Conflict`].
    async fn create_bucket(&self, bucket_key: &str, policy: BucketPolicy) -> ApsResult<Bucket>;

    /// `false` when there was nothing to delete.
    async fn delete_bucket(&self, bucket_key: &str) -> ApsResult<bool>;

    async fn list_objects(&self, bucket_key: &str) -> ApsResult<Vec<ObjectSummary>>;

    async fn delete_object(&self, bucket_key: &str, object_key: &str) -> ApsResult<bool>;

    /// HEAD probe.
    async fn object_exists(&self, bucket_key: &str, object_key: &str) -> ApsResult<bool>;

    /// `Content-Length` from a HEAD request, [`crate::ApsError::NotFound`] on 404.
    async fn object_size(&self, bucket_key: &str, object_key: &str) -> ApsResult<Option<u64>>;

    /// Signed-URL upload: request URL, PUT bytes, complete.
    async fn upload_object(
        &self,
        bucket_key: &str,
        object_key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ApsResult<StoredObject>;

    async fn signed_download_url(
        &self,
        bucket_key: &str,
        object_key: &str,
        minutes_expiration: u32,
    ) -> ApsResult<String>;
}
