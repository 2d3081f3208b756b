//! Workitem 执行编排
//!
//! 构建参数 → 提交 workitem → 固定间隔轮询直到终止状态。
//! 超时后远端作业不会被取消, 只是停止本地轮询。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use aps_core::dynamo::{
    validate_input_model, PACKAGES_FILE, PYTHON_LIBS_FILE, RESULT_JSON_FILE, RESULT_RVT_FILE,
    RUN_REQUEST_FILE,
};
use aps_core::models::{Verb, WorkitemArgument, WorkitemInfo, WorkitemRequest, WorkitemStatus};
use aps_core::progress::steps;
use aps_core::urn::object_id;
use aps_core::{
    AccessTokenSource, ApsError, ApsResult, AppConfig, ObjectStorage, ProgressSink, WorkitemConfig,
    WorkitemService,
};

/// 轮询策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&WorkitemConfig::default())
    }
}

impl From<&WorkitemConfig> for PollPolicy {
    fn from(config: &WorkitemConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_seconds),
            max_attempts: config.max_poll_attempts,
        }
    }
}

/// What to run and where its files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkitemPlan {
    pub activity_id: String,
    pub bucket_key: String,
    pub input_model: String,
}

impl WorkitemPlan {
    /// Fails with a client error unless the input model is `run.rvt`.
    pub fn new(
        activity_id: impl Into<String>,
        bucket_key: impl Into<String>,
        input_model: &str,
    ) -> ApsResult<Self> {
        validate_input_model(input_model)?;
        Ok(Self {
            activity_id: activity_id.into(),
            bucket_key: bucket_key.into(),
            input_model: input_model.to_string(),
        })
    }

    pub fn from_config(config: &AppConfig, input_model: &str) -> ApsResult<Self> {
        Self::new(
            config.design_automation.activity_id(),
            config.storage.bucket_name.clone(),
            input_model,
        )
    }
}

/// 成功完成的 workitem
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkitemOutcome {
    pub id: String,
    pub status: WorkitemStatus,
    pub report_url: Option<String>,
    pub stats: Option<serde_json::Value>,
    pub attempts: u32,
    /// Object keys the activity wrote back to the bucket.
    pub results: Vec<String>,
}

/// Called after every status poll with the latest info and attempt count.
pub type PollObserver<'a> = &'a (dyn Fn(&WorkitemInfo, u32) + Send + Sync);

pub struct WorkitemOrchestrator {
    tokens: Arc<dyn AccessTokenSource>,
    storage: Arc<dyn ObjectStorage>,
    workitems: Arc<dyn WorkitemService>,
    policy: PollPolicy,
}

impl WorkitemOrchestrator {
    pub fn new(
        tokens: Arc<dyn AccessTokenSource>,
        storage: Arc<dyn ObjectStorage>,
        workitems: Arc<dyn WorkitemService>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            tokens,
            storage,
            workitems,
            policy,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Argument slots for the Dynamo activity.
    ///
    /// `packages` is only included when the object exists; a failed probe
    /// counts as absent.
    pub async fn build_arguments(
        &self,
        plan: &WorkitemPlan,
        bearer: &str,
    ) -> BTreeMap<String, WorkitemArgument> {
        let bucket = plan.bucket_key.as_str();
        let url = |key: &str| object_id(bucket, key);

        let mut arguments = BTreeMap::new();
        arguments.insert(
            "rvtFile".to_string(),
            WorkitemArgument::new(url(&plan.input_model), Verb::Get, bearer),
        );
        arguments.insert(
            "runRequest".to_string(),
            WorkitemArgument::new(url(RUN_REQUEST_FILE), Verb::Get, bearer),
        );
        arguments.insert(
            "pythonLibs".to_string(),
            WorkitemArgument::new(url(PYTHON_LIBS_FILE), Verb::Get, bearer),
        );
        arguments.insert(
            "dynResult".to_string(),
            WorkitemArgument::new(url(RESULT_JSON_FILE), Verb::Put, bearer),
        );
        arguments.insert(
            "rvtResult".to_string(),
            WorkitemArgument::new(url(RESULT_RVT_FILE), Verb::Put, bearer),
        );

        match self.storage.object_exists(bucket, PACKAGES_FILE).await {
            Ok(true) => {
                debug!("{} 存在, 添加 packages 参数", PACKAGES_FILE);
                arguments.insert(
                    "packages".to_string(),
                    WorkitemArgument::new(url(PACKAGES_FILE), Verb::Get, bearer),
                );
            }
            Ok(false) => debug!("{} 不存在, 跳过 packages 参数", PACKAGES_FILE),
            Err(e) => warn!("检查 {} 失败, 视为不存在: {}", PACKAGES_FILE, e),
        }

        arguments
    }

    /// Builds the arguments and submits the workitem.
    pub async fn submit(
        &self,
        plan: &WorkitemPlan,
        sink: &dyn ProgressSink,
    ) -> ApsResult<WorkitemInfo> {
        sink.step(steps::TOKEN);
        let bearer = self.tokens.bearer().await?;

        sink.step(steps::WORKITEM);
        let request = WorkitemRequest {
            activity_id: plan.activity_id.clone(),
            arguments: self.build_arguments(plan, &bearer).await,
        };

        let info = self.workitems.submit_workitem(&request).await?;
        counter!("aps_workitems_submitted_total").increment(1);
        sink.message(
            steps::WORKITEM,
            &format!("Workitem {} created with status {}", info.id, info.status),
        );
        Ok(info)
    }

    /// Polls a submitted workitem until it reaches a terminal status.
    pub async fn poll(
        &self,
        submitted: WorkitemInfo,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
        observer: PollObserver<'_>,
    ) -> ApsResult<WorkitemOutcome> {
        sink.step(steps::STATUS);

        let id = submitted.id.clone();
        let mut info = submitted;
        let mut attempts = 0u32;

        while !info.status.is_terminal() {
            if attempts >= self.policy.max_attempts {
                warn!("Workitem {} 在 {} 次轮询后仍未结束", id, attempts);
                record_finished("timeout", attempts);
                sink.step(steps::ERROR);
                sink.message(
                    steps::ERROR,
                    &format!("Workitem {id} timed out after {attempts} polls"),
                );
                return Err(ApsError::WorkitemTimeout { id, attempts });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Workitem {} 的轮询已取消", id);
                    record_finished("cancelled_locally", attempts);
                    return Err(ApsError::Cancelled);
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }

            info = self.workitems.workitem_status(&id).await?;
            attempts += 1;

            sink.message(steps::STATUS, &format!("Workitem status: {}", info.status));
            observer(&info, attempts);
        }

        record_finished(info.status.as_str(), attempts);

        if info.status.is_success() {
            info!("Workitem {} 成功完成 ({} 次轮询)", id, attempts);
            return Ok(WorkitemOutcome {
                id,
                status: info.status,
                report_url: info.report_url,
                stats: info.stats,
                attempts,
                results: vec![RESULT_JSON_FILE.to_string(), RESULT_RVT_FILE.to_string()],
            });
        }

        warn!("Workitem {} 以状态 {} 结束", id, info.status);
        sink.step(steps::ERROR);
        sink.message(
            steps::ERROR,
            &format!("Workitem {id} finished with status {}", info.status),
        );
        Err(ApsError::WorkitemFailed {
            id,
            status: info.status,
            details: json!({
                "reportUrl": info.report_url,
                "stats": info.stats,
            }),
        })
    }

    /// Submits and polls in one go.
    pub async fn run(
        &self,
        plan: &WorkitemPlan,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ApsResult<WorkitemOutcome> {
        let submitted = self.submit(plan, sink).await?;
        self.poll(submitted, sink, cancel, &|_, _| {}).await
    }

    /// Fetches the current remote status once.
    pub async fn status(&self, id: &str) -> ApsResult<WorkitemInfo> {
        self.workitems.workitem_status(id).await
    }
}

fn record_finished(status: &str, attempts: u32) {
    histogram!("aps_workitem_polls").record(attempts as f64);
    counter!("aps_workitems_finished_total", "status" => status.to_string()).increment(1);
}
