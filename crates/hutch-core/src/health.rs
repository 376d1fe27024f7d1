// Cluster health monitor
// Caches one health status per cluster and refreshes it on demand, on a
// debounced global sweep, and from a periodic background task

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use hutch_common::api_path;
use hutch_common::broker::Overview;
use hutch_common::{
    ClusterDescriptor, HealthState, HealthStatus, OverallHealth, ProxyError,
};

use crate::metrics::MetricsSink;
use crate::proxy::ClusterProxy;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Health monitor configuration
#[derive(Clone, Debug)]
pub struct HealthMonitorConfig {
    /// Minimum time between two passive global sweeps
    pub global_ttl: Duration,
    /// How long one cluster's status is served from cache
    pub cluster_ttl: Duration,
    /// Timeout for a single health check request
    pub check_timeout: Duration,
    /// Period of the background sweep task
    pub sweep_interval: Duration,
    /// Checks running at the same time during a sweep
    pub max_concurrent_checks: usize,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            global_ttl: Duration::from_secs(30),
            cluster_ttl: Duration::from_secs(30),
            check_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(30),
            max_concurrent_checks: 8,
        }
    }
}

impl HealthMonitorConfig {
    pub fn with_ttls(mut self, global: Duration, cluster: Duration) -> Self {
        self.global_ttl = global;
        self.cluster_ttl = cluster;
        self
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// The interval is at least one millisecond
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(MIN_SWEEP_INTERVAL);
        self
    }

    pub fn with_max_concurrent_checks(mut self, max: usize) -> Self {
        self.max_concurrent_checks = max.max(1);
        self
    }
}

/// Cache entry; replaced whole, never mutated
#[derive(Debug)]
struct CachedStatus {
    status: HealthStatus,
    checked: Instant,
    stale: bool,
}

impl CachedStatus {
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.stale && self.checked.elapsed() < ttl
    }
}

/// Resets the single-sweep flag when a sweep ends, however it ends
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct HealthMonitor {
    config: HealthMonitorConfig,
    proxy: Arc<ClusterProxy>,
    metrics: Arc<dyn MetricsSink>,
    cache: DashMap<String, Arc<CachedStatus>>,
    last_global_check: Mutex<Option<Instant>>,
    sweeping: AtomicBool,
    /// Advanced on every eviction or invalidation
    epoch: AtomicU64,
    /// Epoch at which each cluster was last evicted or invalidated. A check
    /// started before that epoch must not publish its result.
    retired: DashMap<String, u64>,
}

impl HealthMonitor {
    pub fn new(
        config: HealthMonitorConfig,
        proxy: Arc<ClusterProxy>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            proxy,
            metrics,
            cache: DashMap::new(),
            last_global_check: Mutex::new(None),
            sweeping: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            retired: DashMap::new(),
        }
    }

    pub fn config(&self) -> &HealthMonitorConfig {
        &self.config
    }

    /// Status of one cluster, served from cache while within its TTL
    pub async fn check_cluster(&self, cluster_id: &str) -> Result<HealthStatus, ProxyError> {
        if let Some(cached) = self.cache.get(cluster_id)
            && cached.is_fresh(self.config.cluster_ttl)
        {
            return Ok(cached.status.clone());
        }
        self.refresh_cluster(cluster_id).await
    }

    /// Check one cluster now, ignoring its TTL.
    ///
    /// An inactive cluster reports unhealthy and is dropped from the cache.
    pub async fn refresh_cluster(&self, cluster_id: &str) -> Result<HealthStatus, ProxyError> {
        let since = self.epoch();
        let descriptor = self
            .proxy
            .directory()
            .find_by_id(cluster_id)
            .await
            .map_err(|e| ProxyError::Unexpected {
                cluster_id: cluster_id.to_string(),
                message: "cluster directory lookup failed".to_string(),
                source: Some(e.into()),
            })?;

        let Some(descriptor) = descriptor else {
            self.evict(cluster_id);
            return Err(ProxyError::ClusterNotFound(cluster_id.to_string()));
        };

        if !descriptor.is_accessible() {
            self.evict(cluster_id);
            return Ok(HealthStatus::unhealthy(&descriptor, "cluster is inactive"));
        }

        let status = self.run_check(&descriptor).await;
        self.publish(status.clone(), since);
        Ok(status)
    }

    /// Sweep every active cluster now, ignoring the global TTL
    pub async fn refresh_all(&self) -> OverallHealth {
        self.sweep().await
    }

    /// Sweep only if the global TTL has passed since the last sweep.
    /// Returns whether this call ran a sweep.
    pub async fn sweep_if_due(&self) -> bool {
        if !self.is_sweep_due() {
            return false;
        }
        self.sweep().await;
        true
    }

    /// Aggregate health, sweeping first if the cache is due
    pub async fn overall_health(&self) -> OverallHealth {
        self.sweep_if_due().await;
        self.snapshot()
    }

    /// Aggregate health of whatever is cached right now
    pub fn snapshot(&self) -> OverallHealth {
        OverallHealth::from_statuses(
            self.cache
                .iter()
                .map(|entry| entry.value().status.clone())
                .collect(),
        )
    }

    pub fn cluster_status(&self, cluster_id: &str) -> HealthState {
        self.cache
            .get(cluster_id)
            .map(|entry| entry.status.state())
            .unwrap_or(HealthState::Unknown)
    }

    pub fn cached_status(&self, cluster_id: &str) -> Option<HealthStatus> {
        self.cache.get(cluster_id).map(|entry| entry.status.clone())
    }

    /// Time of the last global sweep, if any ran
    pub fn last_global_check(&self) -> Option<Instant> {
        *self.last_global_check.lock()
    }

    /// Keep the cluster's last status but force a fresh check on next access
    pub fn invalidate(&self, cluster_id: &str) {
        self.retire(cluster_id);
        if let Some(mut entry) = self.cache.get_mut(cluster_id) {
            let stale = Arc::new(CachedStatus {
                status: entry.status.clone(),
                checked: entry.checked,
                stale: true,
            });
            *entry = stale;
        }
    }

    /// Forget a cluster entirely. Checks already in flight for it are discarded.
    pub fn evict(&self, cluster_id: &str) {
        self.retire(cluster_id);
        if self.cache.remove(cluster_id).is_some() {
            debug!("Evicted health status of cluster {}", cluster_id);
        }
    }

    /// Run the periodic sweep in the background.
    ///
    /// Missed ticks are skipped rather than bunched up.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.config.sweep_interval;
        info!("Starting cluster health monitor, interval {:?}", period);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.refresh_all().await;
            }
        })
    }

    fn is_sweep_due(&self) -> bool {
        match *self.last_global_check.lock() {
            Some(last) => last.elapsed() >= self.config.global_ttl,
            None => true,
        }
    }

    /// Check every active cluster. Only one sweep runs at a time; a sweep
    /// requested meanwhile returns the current snapshot.
    async fn sweep(&self) -> OverallHealth {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Health sweep already running");
            return self.snapshot();
        }
        let _guard = SweepGuard(&self.sweeping);
        *self.last_global_check.lock() = Some(Instant::now());
        let since = self.epoch();

        let active = match self.active_clusters().await {
            Ok(active) => active,
            Err(e) => {
                warn!("Health sweep could not list clusters: {}", e);
                return self.snapshot();
            }
        };

        stream::iter(active)
            .map(|descriptor| async move {
                let status = self.run_check(&descriptor).await;
                self.publish(status, since);
            })
            .buffer_unordered(self.config.max_concurrent_checks.max(1))
            .collect::<Vec<()>>()
            .await;

        // The directory may have changed while the checks ran
        match self.active_clusters().await {
            Ok(current) => {
                let ids: HashSet<String> = current.iter().map(|d| d.id().to_string()).collect();
                self.cache.retain(|id, _| ids.contains(id));
            }
            Err(e) => warn!("Health sweep could not prune removed clusters: {}", e),
        }

        let health = self.snapshot();
        self.metrics.set_cluster_health(health.healthy, health.total);
        info!(
            status = %health.status,
            healthy = health.healthy,
            total = health.total,
            "Cluster health sweep finished"
        );
        health
    }

    async fn active_clusters(&self) -> anyhow::Result<Vec<ClusterDescriptor>> {
        Ok(self
            .proxy
            .directory()
            .find_all()
            .await?
            .into_iter()
            .filter(|d| d.is_accessible())
            .collect())
    }

    /// One bounded introspection call. Never fails; failures become unhealthy.
    async fn run_check(&self, descriptor: &ClusterDescriptor) -> HealthStatus {
        let started = Instant::now();

        let outcome = match self.proxy.pool().get(descriptor) {
            Ok(client) => {
                match tokio::time::timeout(self.config.check_timeout, client.get(api_path::OVERVIEW))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProxyError::Timeout {
                        cluster_id: descriptor.id().to_string(),
                        source: None,
                    }),
                }
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(body) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                let message = serde_json::from_value::<Overview>(body)
                    .ok()
                    .and_then(|o| o.rabbitmq_version)
                    .map(|version| format!("reachable, broker version {}", version))
                    .unwrap_or_else(|| "reachable".to_string());
                debug!(cluster_id = descriptor.id(), latency_ms, "Health check passed");
                HealthStatus::healthy(descriptor, message, latency_ms)
            }
            Err(e) => {
                self.metrics.record_health_check_error(descriptor.id());
                warn!(
                    cluster_id = descriptor.id(),
                    kind = e.kind(),
                    error = %e,
                    "Health check failed"
                );
                HealthStatus::unhealthy(descriptor, e.to_string())
            }
        }
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn retire(&self, cluster_id: &str) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.retired.insert(cluster_id.to_string(), epoch);
    }

    /// Cache the result of a check started at epoch `since`, unless the
    /// cluster was evicted or invalidated after that. Returns whether the
    /// status was cached.
    fn publish(&self, status: HealthStatus, since: u64) -> bool {
        // Held until the insert so a concurrent retire waits for it
        let retired = self.retired.get(&status.cluster_id);
        if retired.as_deref().is_some_and(|&at| at > since) {
            debug!(
                cluster_id = %status.cluster_id,
                "Discarded health result of retired cluster"
            );
            return false;
        }
        self.cache.insert(
            status.cluster_id.clone(),
            Arc::new(CachedStatus {
                status,
                checked: Instant::now(),
                stale: false,
            }),
        );
        drop(retired);
        true
    }
}
