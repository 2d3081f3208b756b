
use crate::config::models::AppConfig;

/// A configuration that passes validation.
pub fn sample_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.aps.client_id = "client-id-1234567890".to_string();
    config.aps.client_secret = "secret".to_string();
    config.design_automation.nickname = "dynamoapp".to_string();
    config.design_automation.activity_name = "DynamoActivity".to_string();
    config.design_automation.bundle_app_name = "DynamoRevitBundle".to_string();
    config.storage.bucket_name = "dynamoapp-runs".to_string();
    config
}
