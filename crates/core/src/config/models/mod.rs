pub mod api_observability;
pub mod app_config;
pub mod aps_credentials;
pub mod design_automation;
pub mod storage;

// Re-export main types for easier imports
pub use api_observability::{ApiConfig, ObservabilityConfig};
pub use app_config::{AppConfig, DEFAULT_CONFIG_PATHS};
pub use aps_credentials::ApsConfig;
pub use design_automation::{DesignAutomationConfig, WorkitemConfig};
pub use storage::StorageConfig;
