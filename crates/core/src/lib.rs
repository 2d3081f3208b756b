pub mod config;
pub mod dynamo;
pub mod errors;
pub mod logging;
pub mod models;
pub mod progress;
pub mod traits;
pub mod urn;

pub use config::{
    ApiConfig, AppConfig, ApsConfig, DesignAutomationConfig, ObservabilityConfig, StorageConfig,
    WorkitemConfig,
};
pub use errors::*;
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use progress::{NoopProgress, ProgressEvent, ProgressSink, TracingProgress};
pub use traits::{
    AccessTokenSource, DerivativeService, DesignAutomationApi, ObjectStorage, WorkitemService,
};
