//! 配置管理
//!
//! 配置按以下顺序合并, 后者覆盖前者:
//!
//! 1. 内置默认值
//! 2. TOML 配置文件 (`--config` 指定, 否则 `config/aps.toml` 或 `aps.toml`)
//! 3. `APS__SECTION__KEY` 形式的环境变量
//! 4. 兼容旧版 `.env` 的扁平变量 (`APS_CLIENT_ID`, `APS_BUCKET_NAME`, `PORT` 等)
//!
//! ```toml
//! [aps]
//! client_id = "..."
//! client_secret = "..."
//!
//! [design_automation]
//! nickname = "myapp"
//! activity_name = "DynamoActivity"
//! bundle_app_name = "DynamoRevitBundle"
//!
//! [storage]
//! bucket_name = "myapp-dynamo-runs"
//! ```

pub mod models;

pub use models::*;

#[cfg(test)]
pub mod tests;
