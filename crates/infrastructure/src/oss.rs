use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use aps_core::models::{
    Bucket, BucketPolicy, CreateBucketRequest, ObjectPage, ObjectSummary, SignedDownload,
    SignedUpload, StoredObject, UploadCompletion,
};
use aps_core::{ApsError, ApsResult, ObjectStorage, UploadStep};

use crate::http::{
    failure_details, provisioning, read_json, remote, upstream_error, ApsHttp,
};

const PAGE_LIMIT: &str = "100";

/// OSS 客户端
#[derive(Clone)]
pub struct OssClient {
    http: ApsHttp,
}

impl OssClient {
    pub fn new(http: ApsHttp) -> Self {
        Self { http }
    }

    fn object(&self, bucket_key: &str, object_key: &str, tail: &[&str]) -> Url {
        let mut segments = vec![bucket_key, "objects", object_key];
        segments.extend_from_slice(tail);
        self.http.endpoints().oss(&segments)
    }

    async fn request_upload_url(&self, bucket_key: &str, object_key: &str) -> ApsResult<SignedUpload> {
        let url = self.object(bucket_key, object_key, &["signeds3upload"]);
        let response = self
            .http
            .send("oss.signed_upload", self.http.request(Method::GET, url))
            .await
            .map_err(|e| upload_error(object_key, UploadStep::RequestSignedUrl, e))?;

        if !response.status().is_success() {
            let (_, details) = failure_details(response).await;
            return Err(ApsError::Upload {
                object: object_key.to_string(),
                step: UploadStep::RequestSignedUrl,
                details,
            });
        }

        let signed: SignedUpload = read_json(response, "oss.signed_upload")
            .await
            .map_err(|e| upload_error(object_key, UploadStep::RequestSignedUrl, e))?;

        if signed.urls.is_empty() {
            return Err(ApsError::Upload {
                object: object_key.to_string(),
                step: UploadStep::RequestSignedUrl,
                details: json!("签名上传响应中没有URL"),
            });
        }

        Ok(signed)
    }

    async fn put_bytes(
        &self,
        object_key: &str,
        url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ApsResult<()> {
        let builder = self
            .http
            .client()
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);

        let response = self
            .http
            .send_unauthenticated("oss.put_bytes", builder)
            .await
            .map_err(|e| upload_error(object_key, UploadStep::PutBytes, e))?;

        if !response.status().is_success() {
            let (_, details) = failure_details(response).await;
            return Err(ApsError::Upload {
                object: object_key.to_string(),
                step: UploadStep::PutBytes,
                details,
            });
        }

        Ok(())
    }

    async fn complete_upload(
        &self,
        bucket_key: &str,
        object_key: &str,
        upload_key: &str,
    ) -> ApsResult<UploadCompletion> {
        let url = self.object(bucket_key, object_key, &["signeds3upload"]);
        let builder = self
            .http
            .request(Method::POST, url)
            .json(&json!({ "uploadKey": upload_key }));

        let response = self
            .http
            .send("oss.complete_upload", builder)
            .await
            .map_err(|e| upload_error(object_key, UploadStep::Complete, e))?;

        if !response.status().is_success() {
            let (_, details) = failure_details(response).await;
            return Err(ApsError::Upload {
                object: object_key.to_string(),
                step: UploadStep::Complete,
                details,
            });
        }

        read_json(response, "oss.complete_upload")
            .await
            .map_err(|e| upload_error(object_key, UploadStep::Complete, e))
    }
}

fn upload_error(object_key: &str, step: UploadStep, error: ApsError) -> ApsError {
    match error {
        ApsError::Upload { .. } | ApsError::Auth { .. } => error,
        other => ApsError::Upload {
            object: object_key.to_string(),
            step,
            details: json!(other.to_string()),
        },
    }
}

#[async_trait]
impl ObjectStorage for OssClient {
    async fn bucket_details(&self, bucket_key: &str) -> ApsResult<Option<Bucket>> {
        let url = self.http.endpoints().oss(&[bucket_key, "details"]);
        let response = self
            .http
            .send("oss.bucket_details", self.http.request(Method::GET, url))
            .await?;

        match response.status() {
            status if status.is_success() => {
                Ok(Some(read_json(response, "oss.bucket_details").await?))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(upstream_error(response, provisioning(format!("bucket {bucket_key}"))).await),
        }
    }

    async fn create_bucket(&self, bucket_key: &str, policy: BucketPolicy) -> ApsResult<Bucket> {
        let url = self.http.endpoints().oss(&[]);
        let builder = self
            .http
            .request(Method::POST, url)
            .json(&CreateBucketRequest {
                bucket_key,
                policy_key: policy,
            });

        let response = self.http.send("oss.create_bucket", builder).await?;

        match response.status() {
            status if status.is_success() => {
                info!("存储桶 {} 已创建 ({})", bucket_key, policy);
                read_json(response, "oss.create_bucket").await
            }
            StatusCode::CONFLICT => {
                let (_, details) = failure_details(response).await;
                Err(ApsError::Conflict {
                    resource: format!("bucket {bucket_key}"),
                    details,
                })
            }
            _ => Err(upstream_error(response, provisioning(format!("bucket {bucket_key}"))).await),
        }
    }

    async fn delete_bucket(&self, bucket_key: &str) -> ApsResult<bool> {
        let url = self.http.endpoints().oss(&[bucket_key]);
        let response = self
            .http
            .send("oss.delete_bucket", self.http.request(Method::DELETE, url))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(upstream_error(response, provisioning(format!("bucket {bucket_key}"))).await),
        }
    }

    async fn list_objects(&self, bucket_key: &str) -> ApsResult<Vec<ObjectSummary>> {
        let mut url = self.http.endpoints().oss(&[bucket_key, "objects"]);
        url.query_pairs_mut().append_pair("limit", PAGE_LIMIT);

        let mut objects = Vec::new();
        loop {
            let response = self
                .http
                .send("oss.list_objects", self.http.request(Method::GET, url))
                .await?;

            match response.status() {
                status if status.is_success() => {}
                StatusCode::NOT_FOUND => {
                    return Err(ApsError::NotFound(format!("bucket {bucket_key}")))
                }
                _ => return Err(upstream_error(response, remote("oss.list_objects")).await),
            }

            let page: ObjectPage = read_json(response, "oss.list_objects").await?;
            objects.extend(page.items);

            match page.next.as_deref().map(Url::parse) {
                Some(Ok(next)) => url = next,
                Some(Err(e)) => {
                    warn!("无法解析分页地址, 停止翻页: {}", e);
                    break;
                }
                None => break,
            }
        }

        debug!("存储桶 {} 中共有 {} 个对象", bucket_key, objects.len());
        Ok(objects)
    }

    async fn delete_object(&self, bucket_key: &str, object_key: &str) -> ApsResult<bool> {
        let url = self.object(bucket_key, object_key, &[]);
        let response = self
            .http
            .send("oss.delete_object", self.http.request(Method::DELETE, url))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(upstream_error(response, remote("oss.delete_object")).await),
        }
    }

    async fn object_exists(&self, bucket_key: &str, object_key: &str) -> ApsResult<bool> {
        let url = self.object(bucket_key, object_key, &[]);
        let response = self
            .http
            .send("oss.head_object", self.http.request(Method::HEAD, url))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(upstream_error(response, remote("oss.head_object")).await),
        }
    }

    async fn object_size(&self, bucket_key: &str, object_key: &str) -> ApsResult<Option<u64>> {
        let url = self.object(bucket_key, object_key, &[]);
        let response = self
            .http
            .send("oss.head_object", self.http.request(Method::HEAD, url))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())),
            StatusCode::NOT_FOUND => Err(ApsError::NotFound(format!(
                "{bucket_key}/{object_key}"
            ))),
            _ => Err(upstream_error(response, remote("oss.head_object")).await),
        }
    }

    async fn upload_object(
        &self,
        bucket_key: &str,
        object_key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ApsResult<StoredObject> {
        let size = bytes.len();
        debug!("上传 {} ({} 字节) 到存储桶 {}", object_key, size, bucket_key);

        let signed = self.request_upload_url(bucket_key, object_key).await?;
        self.put_bytes(object_key, &signed.urls[0], bytes, content_type)
            .await?;
        let completion = self
            .complete_upload(bucket_key, object_key, &signed.upload_key)
            .await?;

        info!("{} 上传完成 ({} 字节)", object_key, size);
        Ok(StoredObject::from(completion))
    }

    async fn signed_download_url(
        &self,
        bucket_key: &str,
        object_key: &str,
        minutes_expiration: u32,
    ) -> ApsResult<String> {
        let mut url = self.object(bucket_key, object_key, &["signeds3download"]);
        url.query_pairs_mut()
            .append_pair("minutesExpiration", &minutes_expiration.to_string());

        let response = self
            .http
            .send("oss.signed_download", self.http.request(Method::GET, url))
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ApsError::NotFound(format!("{bucket_key}/{object_key}")))
            }
            _ => return Err(upstream_error(response, remote("oss.signed_download")).await),
        }

        let signed: SignedDownload = read_json(response, "oss.signed_download").await?;
        signed.url.ok_or_else(|| ApsError::Remote {
            operation: "oss.signed_download".to_string(),
            status: 200,
            details: json!({ "status": signed.status }),
        })
    }
}
