use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";
pub const DEFAULT_REGION: &str = "us-east";
pub const DEFAULT_SCOPES: [&str; 6] = [
    "bucket:create",
    "bucket:read",
    "bucket:delete",
    "data:read",
    "data:write",
    "code:all",
];

/// APS 应用凭据与接入点配置
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    /// Design Automation 区域, 例如 `us-east`
    pub region: String,
    pub scopes: Vec<String>,
    pub request_timeout_seconds: u64,
}

impl Default for ApsConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            region: DEFAULT_REGION.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            request_timeout_seconds: 120,
        }
    }
}

// client_secret 不出现在日志中
impl std::fmt::Debug for ApsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("base_url", &self.base_url)
            .field("region", &self.region)
            .field("scopes", &self.scopes)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl ApsConfig {
    /// Space separated scope list, as sent to the token endpoint.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(anyhow::anyhow!("APS client_id 不能为空"));
        }

        if self.client_secret.trim().is_empty() {
            return Err(anyhow::anyhow!("APS client_secret 不能为空"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!("APS base_url 格式无效: {}", self.base_url));
        }

        if self.region.trim().is_empty() {
            return Err(anyhow::anyhow!("Design Automation 区域不能为空"));
        }

        if self.scopes.is_empty() {
            return Err(anyhow::anyhow!("授权范围不能为空"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }

        Ok(())
    }
}
