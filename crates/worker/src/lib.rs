//! APS 工作流服务
//!
//! 资源配置、文件上传、workitem 编排与结果下载。所有服务只依赖
//! `aps-core` 中的 trait, 具体的 HTTP 客户端在启动时注入。

pub mod orchestrator;
pub mod provisioner;
pub mod retrieval;
pub mod tracker;
pub mod uploads;

use std::sync::Arc;

use aps_core::{
    AccessTokenSource, AppConfig, DerivativeService, DesignAutomationApi, ObjectStorage,
    WorkitemService,
};

pub use orchestrator::{PollPolicy, WorkitemOrchestrator, WorkitemOutcome, WorkitemPlan};
pub use provisioner::{suggest_bucket_name, ResourceProvisioner};
pub use retrieval::ResultRetrieval;
pub use tracker::{WorkitemState, WorkitemTracker};
pub use uploads::UploadService;

/// APS 后端实现
#[derive(Clone)]
pub struct Backends {
    pub tokens: Arc<dyn AccessTokenSource>,
    pub storage: Arc<dyn ObjectStorage>,
    pub design_automation: Arc<dyn DesignAutomationApi>,
    pub workitems: Arc<dyn WorkitemService>,
    pub derivative: Arc<dyn DerivativeService>,
}

/// All workflow services built from one configuration.
#[derive(Clone)]
pub struct ApsServices {
    pub tokens: Arc<dyn AccessTokenSource>,
    pub provisioner: Arc<ResourceProvisioner>,
    pub uploads: Arc<UploadService>,
    pub tracker: Arc<WorkitemTracker>,
    pub retrieval: Arc<ResultRetrieval>,
}

impl ApsServices {
    pub fn new(config: &AppConfig, backends: Backends) -> Self {
        let provisioner = ResourceProvisioner::new(
            backends.storage.clone(),
            backends.design_automation.clone(),
            config.design_automation.clone(),
            config.aps.client_id.clone(),
            config.storage.policy,
        );

        let orchestrator = WorkitemOrchestrator::new(
            backends.tokens.clone(),
            backends.storage.clone(),
            backends.workitems.clone(),
            PollPolicy::from(&config.workitem),
        );

        Self {
            tokens: backends.tokens,
            provisioner: Arc::new(provisioner),
            uploads: Arc::new(UploadService::new(
                backends.storage.clone(),
                backends.derivative.clone(),
            )),
            tracker: Arc::new(WorkitemTracker::new(Arc::new(orchestrator))),
            retrieval: Arc::new(ResultRetrieval::new(
                backends.storage,
                backends.derivative,
                config.storage.download_expiry_minutes,
            )),
        }
    }
}
