//! Common test utilities for core integration tests
//!
//! This module provides shared test infrastructure including:
//! - Harness: a mock management API wired to a proxy, engine and monitor
//! - RecordingMetrics: a metrics sink that keeps what it was told

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use wiremock::MockServer;

use hutch_client::{ClientPool, PoolConfig};
use hutch_common::{ClusterDescriptor, Identity, Operation, ResourceType, Role};
use hutch_core::{
    ClusterProxy, HealthMonitor, HealthMonitorConfig, InMemoryAssignments,
    InMemoryClusterDirectory, MemoryAuditSink, MetricsSink, ResourceEngine,
};

/// Default test cluster
pub const CLUSTER_ID: &str = "c1";
pub const CLUSTER_USER: &str = "monitoring";
pub const CLUSTER_PASSWORD: &str = "s3cr3t-pw";

pub fn admin() -> Identity {
    Identity::new("admin-1", "root", Role::Administrator)
}

pub fn user() -> Identity {
    Identity::new("user-1", "alice", Role::User)
}

/// Metrics sink that records every call as a readable line
#[derive(Default)]
pub struct RecordingMetrics {
    lines: Mutex<Vec<String>>,
    health: Mutex<Option<(usize, usize)>>,
}

impl RecordingMetrics {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|l| l.starts_with(prefix))
            .count()
    }

    pub fn health(&self) -> Option<(usize, usize)> {
        *self.health.lock()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record_cluster_access(&self, cluster_id: &str) {
        self.lines.lock().push(format!("cluster_access {}", cluster_id));
    }

    fn record_user_access(&self, username: &str) {
        self.lines.lock().push(format!("user_access {}", username));
    }

    fn record_operation_duration(
        &self,
        resource_type: ResourceType,
        operation: Operation,
        _duration: Duration,
    ) {
        self.lines
            .lock()
            .push(format!("duration {} {}", resource_type, operation));
    }

    fn record_operation_error(&self, resource_type: ResourceType, operation: Operation, kind: &str) {
        self.lines
            .lock()
            .push(format!("error {} {} {}", resource_type, operation, kind));
    }

    fn record_health_check_error(&self, cluster_id: &str) {
        self.lines.lock().push(format!("health_error {}", cluster_id));
    }

    fn set_cluster_health(&self, healthy: usize, total: usize) {
        *self.health.lock() = Some((healthy, total));
    }
}

/// A mock broker plus every component wired against it
pub struct Harness {
    pub server: MockServer,
    pub directory: Arc<InMemoryClusterDirectory>,
    pub assignments: Arc<InMemoryAssignments>,
    pub pool: Arc<ClientPool>,
    pub proxy: Arc<ClusterProxy>,
    pub audit: Arc<MemoryAuditSink>,
    pub metrics: Arc<RecordingMetrics>,
    pub engine: ResourceEngine,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let directory = Arc::new(InMemoryClusterDirectory::new());
        let assignments = Arc::new(InMemoryAssignments::new());
        let pool = Arc::new(ClientPool::new(
            PoolConfig::default().with_timeouts(Duration::from_secs(1), Duration::from_secs(5)),
        ));
        let proxy = Arc::new(ClusterProxy::new(
            directory.clone(),
            assignments.clone(),
            pool.clone(),
        ));
        let audit = Arc::new(MemoryAuditSink::new());
        let metrics = Arc::new(RecordingMetrics::default());
        let engine = ResourceEngine::new(proxy.clone(), audit.clone(), metrics.clone());

        let harness = Self {
            server,
            directory,
            assignments,
            pool,
            proxy,
            audit,
            metrics,
            engine,
        };
        harness.add_cluster(CLUSTER_ID, "");
        harness
    }

    /// Register a cluster whose management API lives under `prefix` on the mock server
    pub fn add_cluster(&self, id: &str, prefix: &str) -> ClusterDescriptor {
        let base_url = format!("{}/{}", self.server.uri(), prefix.trim_matches('/'));
        self.directory.upsert(
            ClusterDescriptor::new(id, id, &base_url, CLUSTER_USER, CLUSTER_PASSWORD)
                .expect("valid descriptor"),
        )
    }

    pub fn monitor(&self, config: HealthMonitorConfig) -> Arc<HealthMonitor> {
        Arc::new(HealthMonitor::new(
            config,
            self.proxy.clone(),
            self.metrics.clone(),
        ))
    }

    pub async fn received(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
}
