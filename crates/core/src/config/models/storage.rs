use serde::{Deserialize, Serialize};

use crate::models::BucketPolicy;
use crate::urn::is_valid_bucket_key;

/// OSS 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket_name: String,
    pub policy: BucketPolicy,
    pub download_expiry_minutes: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            policy: BucketPolicy::Transient,
            download_expiry_minutes: 60,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bucket_name.is_empty() {
            return Err(anyhow::anyhow!("存储桶名称不能为空"));
        }

        if !is_valid_bucket_key(&self.bucket_name) {
            return Err(anyhow::anyhow!(
                "存储桶名称无效: {}，只允许 3-128 位小写字母、数字及 '-', '_', '.'",
                self.bucket_name
            ));
        }

        // OSS 限制签名下载链接有效期为 1-60 分钟
        if self.download_expiry_minutes == 0 || self.download_expiry_minutes > 60 {
            return Err(anyhow::anyhow!("下载链接有效期必须在1到60分钟之间"));
        }

        Ok(())
    }
}
