//! Per-cluster client pool
//!
//! One `PooledClient` is cached per cluster id. Entries are replaced whole, so
//! a reader holds either the previous client or the new one, never a mix.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use hutch_common::{ClusterDescriptor, ProxyError};

use crate::config::PoolConfig;
use crate::http::PooledClient;

/// Concurrent cache of cluster clients keyed by cluster id
pub struct ClientPool {
    config: PoolConfig,
    clients: DashMap<String, Arc<PooledClient>>,
}

impl ClientPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            clients: DashMap::new(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get the client for a cluster, building it on first use.
    ///
    /// A cached client built from other connection settings than `descriptor`
    /// is rebuilt, whatever revision either side carries.
    pub fn get(&self, descriptor: &ClusterDescriptor) -> Result<Arc<PooledClient>, ProxyError> {
        reject_inactive(descriptor)?;

        if let Some(client) = self.clients.get(descriptor.id())
            && is_current(&client, descriptor)
        {
            return Ok(client.clone());
        }

        match self.clients.entry(descriptor.id().to_string()) {
            Entry::Occupied(mut entry) => {
                if is_current(entry.get(), descriptor) {
                    return Ok(entry.get().clone());
                }
                let client = Arc::new(PooledClient::build(descriptor, &self.config)?);
                entry.insert(client.clone());
                info!(
                    cluster_id = descriptor.id(),
                    version = descriptor.version(),
                    "Rebuilt stale cluster client"
                );
                Ok(client)
            }
            Entry::Vacant(entry) => {
                let client = Arc::new(PooledClient::build(descriptor, &self.config)?);
                entry.insert(client.clone());
                debug!(cluster_id = descriptor.id(), "Created cluster client");
                Ok(client)
            }
        }
    }

    /// Replace the cached client after the descriptor changed.
    ///
    /// Always replaces the entry. An inactive descriptor evicts it and fails.
    /// The replacement is visible to every lookup once this returns.
    pub fn update(&self, descriptor: &ClusterDescriptor) -> Result<Arc<PooledClient>, ProxyError> {
        if let Err(e) = reject_inactive(descriptor) {
            self.remove(descriptor.id());
            return Err(e);
        }

        match self.clients.entry(descriptor.id().to_string()) {
            Entry::Occupied(mut entry) => {
                let client = Arc::new(PooledClient::build(descriptor, &self.config)?);
                entry.insert(client.clone());
                info!(
                    cluster_id = descriptor.id(),
                    version = descriptor.version(),
                    "Replaced cluster client"
                );
                Ok(client)
            }
            Entry::Vacant(entry) => {
                let client = Arc::new(PooledClient::build(descriptor, &self.config)?);
                entry.insert(client.clone());
                Ok(client)
            }
        }
    }

    /// Evict a cluster's client. Returns whether an entry existed.
    pub fn remove(&self, cluster_id: &str) -> bool {
        let removed = self.clients.remove(cluster_id).is_some();
        if removed {
            debug!("Removed cluster client for {}", cluster_id);
        }
        removed
    }

    pub fn contains(&self, cluster_id: &str) -> bool {
        self.clients.contains_key(cluster_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn clear(&self) {
        self.clients.clear();
    }
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

fn reject_inactive(descriptor: &ClusterDescriptor) -> Result<(), ProxyError> {
    if descriptor.is_accessible() {
        Ok(())
    } else {
        Err(ProxyError::ClusterInactive(descriptor.id().to_string()))
    }
}

/// Revision numbers restart when a cluster is re-created, so only the
/// connection settings decide whether a cached client may be served
fn is_current(client: &PooledClient, descriptor: &ClusterDescriptor) -> bool {
    client.matches(descriptor)
}
