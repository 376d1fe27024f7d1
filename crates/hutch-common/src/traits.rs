//! Collaborator traits for dependency injection
//!
//! Cluster storage and identity-to-cluster assignments are owned outside this
//! workspace. These traits let the proxy and the health monitor depend only on
//! the lookups they need.

use crate::model::ClusterDescriptor;

/// Read access to stored cluster descriptors
#[async_trait::async_trait]
pub trait ClusterDirectory: Send + Sync {
    /// Look up one cluster. `Ok(None)` means the cluster does not exist.
    async fn find_by_id(&self, cluster_id: &str) -> anyhow::Result<Option<ClusterDescriptor>>;

    /// Every stored cluster, active or not
    async fn find_all(&self) -> anyhow::Result<Vec<ClusterDescriptor>>;
}

/// Explicit grants allowing a non-administrator identity to use a cluster
#[async_trait::async_trait]
pub trait AssignmentLookup: Send + Sync {
    async fn has_access(&self, identity_id: &str, cluster_id: &str) -> anyhow::Result<bool>;
}
