use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use aps_api::{create_app, AppState};
use aps_core::AppConfig;
use aps_infrastructure::ApsClients;
use aps_worker::{ApsServices, Backends};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{debug, info, warn};

const PRUNE_INTERVAL: Duration = Duration::from_secs(300);
const WORKITEM_RETENTION: Duration = Duration::from_secs(3600);

/// 主应用程序
pub struct Application {
    config: Arc<AppConfig>,
    services: ApsServices,
    metrics: Option<PrometheusHandle>,
}

impl Application {
    pub fn new(config: AppConfig) -> Result<Self> {
        let clients = ApsClients::new(&config.aps).context("创建APS客户端失败")?;

        let backends = Backends {
            tokens: clients.tokens,
            storage: clients.oss,
            design_automation: clients.design_automation.clone(),
            workitems: clients.design_automation,
            derivative: clients.derivative,
        };
        let services = ApsServices::new(&config, backends);

        let metrics = if config.observability.metrics_enabled {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("安装Prometheus指标记录器失败")?;
            Some(handle)
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            services,
            metrics,
        })
    }

    /// Serves the HTTP API until the shutdown signal arrives.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let bind_address = self.config.api.bind_address();

        let mut state = AppState::new(self.services.clone(), Arc::clone(&self.config));
        if let Some(handle) = &self.metrics {
            state = state.with_metrics(handle.clone());
        }
        let progress = Arc::clone(&state.progress);
        let app = create_app(state);

        let listener = TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;

        info!("API服务器启动在 http://{}", bind_address);

        let prune_handle = {
            let mut shutdown_rx = shutdown_rx.resubscribe();
            let tracker = Arc::clone(&self.services.tracker);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(PRUNE_INTERVAL);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let pruned = progress.prune();
                            if pruned > 0 {
                                debug!("清理 {} 个无订阅者的进度会话", pruned);
                            }
                            tracker.prune(WORKITEM_RETENTION).await;
                        }
                        _ = shutdown_rx.recv() => break,
                    }
                }
            })
        };

        let tracker = Arc::clone(&self.services.tracker);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
                tracker.shutdown().await;
            })
            .await
            .context("API服务器运行失败")?;

        if let Err(e) = prune_handle.await {
            warn!("清理任务异常退出: {}", e);
        }

        info!("API服务器已停止");
        Ok(())
    }
}
