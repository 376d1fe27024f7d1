//! Reactions to cluster descriptor changes
//!
//! The directory that owns descriptors calls these hooks after it stored a
//! change, so that neither pooled clients nor cached health outlive the
//! descriptor they were derived from.

use std::sync::Arc;

use tracing::info;

use hutch_client::ClientPool;
use hutch_common::ClusterDescriptor;

use crate::health::HealthMonitor;

pub struct ClusterLifecycle {
    pool: Arc<ClientPool>,
    monitor: Arc<HealthMonitor>,
}

impl ClusterLifecycle {
    pub fn new(pool: Arc<ClientPool>, monitor: Arc<HealthMonitor>) -> Self {
        Self { pool, monitor }
    }

    /// A descriptor was created or changed
    pub fn on_updated(&self, descriptor: &ClusterDescriptor) {
        match self.pool.update(descriptor) {
            Ok(_) => self.monitor.invalidate(descriptor.id()),
            // Inactive or unbuildable: nothing derived from the old descriptor may stay
            Err(_) => {
                self.pool.remove(descriptor.id());
                self.monitor.evict(descriptor.id());
            }
        }
        info!(
            cluster_id = descriptor.id(),
            version = descriptor.version(),
            active = descriptor.is_accessible(),
            "Cluster descriptor updated"
        );
    }

    /// A descriptor was deleted
    pub fn on_deleted(&self, cluster_id: &str) {
        self.pool.remove(cluster_id);
        self.monitor.evict(cluster_id);
        info!(cluster_id, "Cluster descriptor deleted");
    }
}
