//! In-memory collaborator implementations
//!
//! Used by the server binary for statically configured clusters and by tests.

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use hutch_common::{AssignmentLookup, ClusterDescriptor, ClusterDirectory};

/// Cluster directory backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryClusterDirectory {
    clusters: DashMap<String, ClusterDescriptor>,
}

impl InMemoryClusterDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a descriptor and return it with its assigned revision.
    ///
    /// Replacing an existing cluster always yields a higher revision than the
    /// one it replaces.
    pub fn upsert(&self, descriptor: ClusterDescriptor) -> ClusterDescriptor {
        match self.clusters.entry(descriptor.id().to_string()) {
            Entry::Occupied(mut entry) => {
                let stored = if entry.get().version() >= descriptor.version() {
                    let next = entry.get().version() + 1;
                    descriptor.with_version(next)
                } else {
                    descriptor
                };
                entry.insert(stored.clone());
                stored
            }
            Entry::Vacant(entry) => entry.insert(descriptor).clone(),
        }
    }

    pub fn remove(&self, cluster_id: &str) -> Option<ClusterDescriptor> {
        self.clusters.remove(cluster_id).map(|(_, d)| d)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

impl FromIterator<ClusterDescriptor> for InMemoryClusterDirectory {
    fn from_iter<T: IntoIterator<Item = ClusterDescriptor>>(iter: T) -> Self {
        let directory = Self::new();
        for descriptor in iter {
            directory.upsert(descriptor);
        }
        directory
    }
}

#[async_trait::async_trait]
impl ClusterDirectory for InMemoryClusterDirectory {
    async fn find_by_id(&self, cluster_id: &str) -> anyhow::Result<Option<ClusterDescriptor>> {
        Ok(self.clusters.get(cluster_id).map(|d| d.clone()))
    }

    async fn find_all(&self) -> anyhow::Result<Vec<ClusterDescriptor>> {
        let mut all: Vec<_> = self.clusters.iter().map(|d| d.value().clone()).collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(all)
    }
}

/// Assignment edges kept as `(identity_id, cluster_id)` pairs
#[derive(Debug, Default)]
pub struct InMemoryAssignments {
    edges: DashSet<(String, String)>,
}

impl InMemoryAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, identity_id: &str, cluster_id: &str) {
        self.edges
            .insert((identity_id.to_string(), cluster_id.to_string()));
    }

    pub fn revoke(&self, identity_id: &str, cluster_id: &str) -> bool {
        self.edges
            .remove(&(identity_id.to_string(), cluster_id.to_string()))
            .is_some()
    }

    /// Drop every assignment to a cluster, e.g. after it was deleted
    pub fn revoke_cluster(&self, cluster_id: &str) {
        self.edges.retain(|(_, c)| c != cluster_id);
    }
}

#[async_trait::async_trait]
impl AssignmentLookup for InMemoryAssignments {
    async fn has_access(&self, identity_id: &str, cluster_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .edges
            .contains(&(identity_id.to_string(), cluster_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str) -> ClusterDescriptor {
        ClusterDescriptor::new(id, id, "http://localhost:15672", "guest", "guest").unwrap()
    }

    #[tokio::test]
    async fn test_directory_upsert_bumps_version() {
        let directory = InMemoryClusterDirectory::new();
        let first = directory.upsert(descriptor("c1"));
        let second = directory.upsert(descriptor("c1"));

        assert!(second.version() > first.version());
        let found = directory.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(found.version(), second.version());
        assert!(directory.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_get_distinct_versions() {
        let directory = std::sync::Arc::new(InMemoryClusterDirectory::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let directory = directory.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| directory.upsert(descriptor("c1")).version())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut versions: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let total = versions.len();
        versions.sort_unstable();
        versions.dedup();

        assert_eq!(versions.len(), total);
        let stored = directory.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(Some(&stored.version()), versions.last());
    }

    #[tokio::test]
    async fn test_directory_find_all_sorted() {
        let directory: InMemoryClusterDirectory =
            vec![descriptor("b"), descriptor("a")].into_iter().collect();
        let ids: Vec<_> = directory
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|d| d.id().to_string())
            .collect();

        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_assignments() {
        let assignments = InMemoryAssignments::new();
        assignments.grant("u1", "c1");
        assignments.grant("u2", "c1");

        assert!(assignments.has_access("u1", "c1").await.unwrap());
        assert!(!assignments.has_access("u1", "c2").await.unwrap());

        assert!(assignments.revoke("u1", "c1"));
        assert!(!assignments.has_access("u1", "c1").await.unwrap());

        assignments.revoke_cluster("c1");
        assert!(!assignments.has_access("u2", "c1").await.unwrap());
    }
}
