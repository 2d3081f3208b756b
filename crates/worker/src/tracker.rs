use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use aps_core::models::{WorkitemInfo, WorkitemStatus};
use aps_core::{ApsError, ApsResult, ProgressSink};
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::orchestrator::{WorkitemOrchestrator, WorkitemOutcome, WorkitemPlan};

/// 被跟踪 workitem 的本地状态
#[derive(Debug, Clone)]
pub enum WorkitemState {
    Submitted,
    Polling {
        status: WorkitemStatus,
        attempts: u32,
    },
    Finished(WorkitemOutcome),
    Failed(Arc<ApsError>),
    Cancelled,
}

impl WorkitemState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkitemState::Finished(_) | WorkitemState::Failed(_) | WorkitemState::Cancelled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkitemState::Submitted => "submitted",
            WorkitemState::Polling { .. } => "polling",
            WorkitemState::Finished(_) => "finished",
            WorkitemState::Failed(_) => "failed",
            WorkitemState::Cancelled => "cancelled",
        }
    }
}

struct Tracked {
    state: watch::Receiver<WorkitemState>,
    cancel: CancellationToken,
    finished_at: Arc<OnceLock<Instant>>,
}

impl Tracked {
    fn expired(&self, retention: Duration) -> bool {
        self.state.borrow().is_terminal()
            && self
                .finished_at
                .get()
                .is_some_and(|finished| finished.elapsed() >= retention)
    }
}

/// 后台轮询 workitem 并保存可查询的状态
///
/// 提交在调用者的请求中完成, 轮询在独立任务中进行, 因此客户端断开
/// 不会中断等待。所有轮询任务都挂在同一个根取消令牌下。
pub struct WorkitemTracker {
    orchestrator: Arc<WorkitemOrchestrator>,
    tracked: Arc<RwLock<HashMap<String, Tracked>>>,
    shutdown: CancellationToken,
}

impl WorkitemTracker {
    pub fn new(orchestrator: Arc<WorkitemOrchestrator>) -> Self {
        Self {
            orchestrator,
            tracked: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<WorkitemOrchestrator> {
        &self.orchestrator
    }

    /// Submits the workitem and starts polling it in the background.
    pub async fn start(
        &self,
        plan: &WorkitemPlan,
        sink: Arc<dyn ProgressSink>,
    ) -> ApsResult<String> {
        if self.shutdown.is_cancelled() {
            return Err(ApsError::Cancelled);
        }

        let submitted = self.orchestrator.submit(plan, sink.as_ref()).await?;
        let id = submitted.id.clone();
        self.spawn_poll(submitted, sink).await;
        Ok(id)
    }

    /// Starts observing a workitem submitted earlier, e.g. before a restart.
    ///
    /// A workitem that is already being polled is left alone.
    pub async fn resume(&self, id: &str, sink: Arc<dyn ProgressSink>) -> ApsResult<WorkitemState> {
        if let Some(state) = self.get(id).await {
            if !state.is_terminal() {
                return Ok(state);
            }
        }
        if self.shutdown.is_cancelled() {
            return Err(ApsError::Cancelled);
        }

        let current = self.orchestrator.status(id).await?;
        info!("恢复跟踪 workitem {} (状态 {})", id, current.status);
        self.spawn_poll(current, sink).await;

        self.get(id)
            .await
            .ok_or_else(|| ApsError::Internal(format!("workitem {id} 未被跟踪")))
    }

    async fn spawn_poll(&self, submitted: WorkitemInfo, sink: Arc<dyn ProgressSink>) {
        let id = submitted.id.clone();
        let (tx, rx) = watch::channel(WorkitemState::Submitted);
        let cancel = self.shutdown.child_token();
        let finished_at = Arc::new(OnceLock::new());

        {
            let mut tracked = self.tracked.write().await;
            if let Some(previous) = tracked.insert(
                id.clone(),
                Tracked {
                    state: rx,
                    cancel: cancel.clone(),
                    finished_at: Arc::clone(&finished_at),
                },
            ) {
                previous.cancel.cancel();
            }
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            let observer = |info: &WorkitemInfo, attempts: u32| {
                tx.send_replace(WorkitemState::Polling {
                    status: info.status.clone(),
                    attempts,
                });
            };

            let result = orchestrator
                .poll(submitted, sink.as_ref(), &cancel, &observer)
                .await;

            let state = match result {
                Ok(outcome) => WorkitemState::Finished(outcome),
                Err(ApsError::Cancelled) => WorkitemState::Cancelled,
                Err(e) => {
                    error!("Workitem {} 失败: {}", id, e);
                    WorkitemState::Failed(Arc::new(e))
                }
            };
            let _ = finished_at.set(Instant::now());
            tx.send_replace(state);
        });
    }

    pub async fn get(&self, id: &str) -> Option<WorkitemState> {
        let tracked = self.tracked.read().await;
        tracked.get(id).map(|t| t.state.borrow().clone())
    }

    /// Waits until the workitem reaches a terminal local state.
    pub async fn wait(&self, id: &str) -> ApsResult<WorkitemState> {
        let mut state = {
            let tracked = self.tracked.read().await;
            tracked
                .get(id)
                .map(|t| t.state.clone())
                .ok_or_else(|| ApsError::NotFound(format!("workitem {id}")))?
        };

        let terminal = state
            .wait_for(WorkitemState::is_terminal)
            .await
            .map_err(|_| ApsError::Internal(format!("workitem {id} 的轮询任务意外结束")))?;
        Ok(terminal.clone())
    }

    /// Stops local polling; the remote workitem keeps running.
    pub async fn cancel(&self, id: &str) -> ApsResult<bool> {
        let tracked = self.tracked.read().await;
        let entry = tracked
            .get(id)
            .ok_or_else(|| ApsError::NotFound(format!("workitem {id}")))?;

        if entry.state.borrow().is_terminal() {
            return Ok(false);
        }
        entry.cancel.cancel();
        info!("已请求取消 workitem {} 的轮询", id);
        Ok(true)
    }

    pub async fn active_count(&self) -> usize {
        let tracked = self.tracked.read().await;
        tracked
            .values()
            .filter(|t| !t.state.borrow().is_terminal())
            .count()
    }

    /// Forgets workitems that ended more than `retention` ago.
    pub async fn prune(&self, retention: Duration) -> usize {
        let mut tracked = self.tracked.write().await;
        let before = tracked.len();
        tracked.retain(|_, entry| !entry.expired(retention));

        let pruned = before - tracked.len();
        if pruned > 0 {
            debug!("清理 {} 个已结束的 workitem", pruned);
        }
        pruned
    }

    pub async fn tracked_count(&self) -> usize {
        self.tracked.read().await.len()
    }

    /// Cancels every tracked poll.
    pub async fn shutdown(&self) {
        let active = self.active_count().await;
        if active > 0 {
            warn!("关闭时仍有 {} 个 workitem 在轮询", active);
        }
        self.shutdown.cancel();
    }
}
