//! Component wiring and process lifecycle

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use hutch_client::ClientPool;
use hutch_core::{
    AuditSink, ClusterLifecycle, ClusterProxy, HealthMonitor, InMemoryAssignments,
    InMemoryClusterDirectory, MetricsSink, NoopMetricsSink, RecorderMetricsSink, ResourceEngine,
    TracingAuditSink,
};

use crate::configuration::Configuration;

/// Every long-lived component of the server
pub struct Application {
    pub directory: Arc<InMemoryClusterDirectory>,
    pub assignments: Arc<InMemoryAssignments>,
    pub pool: Arc<ClientPool>,
    pub proxy: Arc<ClusterProxy>,
    pub engine: Arc<ResourceEngine>,
    pub monitor: Arc<HealthMonitor>,
    pub lifecycle: ClusterLifecycle,
}

impl Application {
    /// Build the component graph from configuration.
    ///
    /// Metrics go to the global recorder only when the exporter is enabled.
    pub fn build(configuration: &Configuration) -> anyhow::Result<Self> {
        let directory: Arc<InMemoryClusterDirectory> =
            Arc::new(configuration.clusters()?.into_iter().collect());

        let assignments = Arc::new(InMemoryAssignments::new());
        for entry in configuration.assignments()? {
            assignments.grant(&entry.identity_id, &entry.cluster_id);
        }

        let metrics: Arc<dyn MetricsSink> = if configuration.metrics_enabled() {
            Arc::new(RecorderMetricsSink)
        } else {
            Arc::new(NoopMetricsSink)
        };
        let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);

        let pool = Arc::new(ClientPool::new(configuration.pool_config()));
        let proxy = Arc::new(ClusterProxy::new(
            directory.clone(),
            assignments.clone(),
            pool.clone(),
        ));
        let engine = Arc::new(ResourceEngine::new(proxy.clone(), audit, metrics.clone()));
        let monitor = Arc::new(HealthMonitor::new(
            configuration.health_config()?,
            proxy.clone(),
            metrics,
        ));
        let lifecycle = ClusterLifecycle::new(pool.clone(), monitor.clone());

        info!(clusters = directory.len(), "Cluster directory loaded");

        Ok(Self {
            directory,
            assignments,
            pool,
            proxy,
            engine,
            monitor,
            lifecycle,
        })
    }

    /// Start background tasks and block until a shutdown signal arrives
    pub async fn run(self) {
        let sweep: JoinHandle<()> = self.monitor.clone().start();

        wait_for_shutdown_signal().await;

        sweep.abort();
        self.pool.clear();
        info!("Shutdown complete");
    }
}

/// Wait for Ctrl+C or SIGTERM
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
