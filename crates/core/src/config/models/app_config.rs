use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::{
    api_observability::{ApiConfig, ObservabilityConfig},
    aps_credentials::{ApsConfig, DEFAULT_BASE_URL, DEFAULT_REGION, DEFAULT_SCOPES},
    design_automation::{DesignAutomationConfig, WorkitemConfig, DEFAULT_ALIAS, DEFAULT_ENGINE},
    storage::StorageConfig,
};

/// 默认配置文件搜索路径
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/aps.toml", "aps.toml"];

/// 兼容旧版 `.env` 的扁平环境变量 -> 配置键
const LEGACY_ENV_KEYS: [(&str, &str); 7] = [
    ("APS_CLIENT_ID", "aps.client_id"),
    ("APS_CLIENT_SECRET", "aps.client_secret"),
    ("APS_BUCKET_NAME", "storage.bucket_name"),
    ("APS_NICKNAME", "design_automation.nickname"),
    ("APS_ACTIVITY_NAME", "design_automation.activity_name"),
    ("APS_BUNDLE_APP_NAME", "design_automation.bundle_app_name"),
    ("PORT", "api.port"),
];

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub aps: ApsConfig,
    pub design_automation: DesignAutomationConfig,
    pub storage: StorageConfig,
    pub workitem: WorkitemConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from config file and the process environment
    ///
    /// Load order:
    /// 1. Default configuration
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (`APS__SECTION__KEY`)
    /// 4. Legacy flat variables (`APS_CLIENT_ID`, `APS_BUCKET_NAME`, `PORT`, ...)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_from(config_path, std::env::vars().collect())
    }

    /// Same as [`AppConfig::load`], reading overrides from `env` instead of the process.
    pub fn load_from(config_path: Option<&str>, env: HashMap<String, String>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("aps.client_id", "")?
            .set_default("aps.client_secret", "")?
            .set_default("aps.base_url", DEFAULT_BASE_URL)?
            .set_default("aps.region", DEFAULT_REGION)?
            .set_default("aps.scopes", DEFAULT_SCOPES.to_vec())?
            .set_default("aps.request_timeout_seconds", 120)?
            .set_default("design_automation.nickname", "")?
            .set_default("design_automation.activity_name", "")?
            .set_default("design_automation.bundle_app_name", "")?
            .set_default("design_automation.alias", DEFAULT_ALIAS)?
            .set_default("design_automation.engine", DEFAULT_ENGINE)?
            .set_default("storage.bucket_name", "")?
            .set_default("storage.policy", "transient")?
            .set_default("storage.download_expiry_minutes", 60)?
            .set_default("workitem.poll_interval_seconds", 5)?
            .set_default("workitem.max_poll_attempts", 60)?
            .set_default("api.host", "0.0.0.0")?
            .set_default("api.port", 3000)?
            .set_default("api.cors_enabled", true)?
            .set_default("api.cors_origins", vec!["*"])?
            .set_default("api.max_upload_size_mb", 512)?
            .set_default("observability.log_level", "info")?
            .set_default("observability.log_format", "pretty")?
            .set_default("observability.metrics_enabled", true)?
            .set_default("observability.metrics_endpoint", "/metrics")?;

        match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(anyhow::anyhow!("配置文件不存在: {}", path));
                }
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
            None => {
                if let Some(path) = DEFAULT_CONFIG_PATHS
                    .iter()
                    .find(|path| Path::new(path).exists())
                {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("APS")
                .prefix_separator("__")
                .separator("__")
                .list_separator(" ")
                .with_list_parse_key("aps.scopes")
                .with_list_parse_key("api.cors_origins")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        for (variable, key) in LEGACY_ENV_KEYS {
            if let Some(value) = env.get(variable).filter(|value| !value.is_empty()) {
                builder = builder.set_override(key, value.as_str())?;
            }
        }

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    /// Validate configuration effectiveness
    pub fn validate(&self) -> Result<()> {
        self.aps.validate().context("APS凭据配置验证失败")?;

        self.design_automation
            .validate()
            .context("Design Automation配置验证失败")?;

        self.storage.validate().context("存储配置验证失败")?;

        self.workitem.validate().context("Workitem配置验证失败")?;

        self.api.validate().context("API配置验证失败")?;

        self.observability
            .validate()
            .context("可观测性配置验证失败")?;

        Ok(())
    }
}
