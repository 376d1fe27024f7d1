//! Access-controlled request proxy
//!
//! Every call revalidates the caller against the directory and the assignment
//! lookup before any upstream request is sent. Nothing about an access
//! decision is cached between calls.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use hutch_client::{ClientPool, Method, PooledClient};
use hutch_common::{
    AccessDecision, AssignmentLookup, ClusterDescriptor, ClusterDirectory, Identity, ProxyError,
};

pub struct ClusterProxy {
    directory: Arc<dyn ClusterDirectory>,
    assignments: Arc<dyn AssignmentLookup>,
    pool: Arc<ClientPool>,
}

impl ClusterProxy {
    pub fn new(
        directory: Arc<dyn ClusterDirectory>,
        assignments: Arc<dyn AssignmentLookup>,
        pool: Arc<ClientPool>,
    ) -> Self {
        Self {
            directory,
            assignments,
            pool,
        }
    }

    pub fn pool(&self) -> &Arc<ClientPool> {
        &self.pool
    }

    pub fn directory(&self) -> &Arc<dyn ClusterDirectory> {
        &self.directory
    }

    /// Look up a cluster that exists and is active
    pub async fn resolve(&self, cluster_id: &str) -> Result<ClusterDescriptor, ProxyError> {
        let descriptor = self
            .directory
            .find_by_id(cluster_id)
            .await
            .map_err(|e| ProxyError::Unexpected {
                cluster_id: cluster_id.to_string(),
                message: "cluster directory lookup failed".to_string(),
                source: Some(e.into()),
            })?
            .ok_or_else(|| ProxyError::ClusterNotFound(cluster_id.to_string()))?;

        if !descriptor.is_accessible() {
            return Err(ProxyError::ClusterInactive(cluster_id.to_string()));
        }
        Ok(descriptor)
    }

    /// Check that `identity` may use `cluster_id`.
    ///
    /// Fails in order: missing identity, unknown cluster, inactive cluster,
    /// missing assignment for a non-administrator.
    pub async fn validate_access(
        &self,
        cluster_id: &str,
        identity: Option<&Identity>,
    ) -> Result<ClusterDescriptor, ProxyError> {
        let Some(identity) = identity else {
            warn!(cluster_id, "Rejected unauthenticated cluster request");
            return Err(ProxyError::AccessDenied(
                "no authenticated identity".to_string(),
            ));
        };

        let descriptor = self.resolve(cluster_id).await?;

        let has_assignment = if identity.role.bypasses_assignment() {
            false
        } else {
            self.assignments
                .has_access(&identity.id, cluster_id)
                .await
                .map_err(|e| ProxyError::Unexpected {
                    cluster_id: cluster_id.to_string(),
                    message: "assignment lookup failed".to_string(),
                    source: Some(e.into()),
                })?
        };

        if !AccessDecision::evaluate(identity.role, has_assignment).is_allowed() {
            warn!(
                cluster_id,
                user = %identity.username,
                role = %identity.role,
                "Cluster access denied"
            );
            return Err(ProxyError::AccessDenied(format!(
                "user '{}' is not assigned to cluster '{}'",
                identity.username, cluster_id
            )));
        }

        Ok(descriptor)
    }

    /// Validate access and hand out the cluster's pooled client
    pub async fn client_for(
        &self,
        cluster_id: &str,
        identity: Option<&Identity>,
    ) -> Result<Arc<PooledClient>, ProxyError> {
        let descriptor = self.validate_access(cluster_id, identity).await?;
        self.pool.get(&descriptor)
    }

    pub async fn call(
        &self,
        method: Method,
        cluster_id: &str,
        path: &str,
        body: Option<&Value>,
        identity: Option<&Identity>,
    ) -> Result<Value, ProxyError> {
        let client = self.client_for(cluster_id, identity).await?;
        debug!(cluster_id, %method, path, "Proxying cluster request");
        client.execute(method, path, body).await
    }

    pub async fn get(
        &self,
        cluster_id: &str,
        path: &str,
        identity: Option<&Identity>,
    ) -> Result<Value, ProxyError> {
        self.call(Method::GET, cluster_id, path, None, identity).await
    }

    pub async fn post(
        &self,
        cluster_id: &str,
        path: &str,
        body: Option<&Value>,
        identity: Option<&Identity>,
    ) -> Result<Value, ProxyError> {
        self.call(Method::POST, cluster_id, path, body, identity)
            .await
    }

    pub async fn put(
        &self,
        cluster_id: &str,
        path: &str,
        body: Option<&Value>,
        identity: Option<&Identity>,
    ) -> Result<Value, ProxyError> {
        self.call(Method::PUT, cluster_id, path, body, identity).await
    }

    pub async fn delete(
        &self,
        cluster_id: &str,
        path: &str,
        identity: Option<&Identity>,
    ) -> Result<Value, ProxyError> {
        self.call(Method::DELETE, cluster_id, path, None, identity)
            .await
    }
}
