//! Core data model: cluster descriptors, identities, and health values

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProxyError;

/// Configuration needed to reach one broker cluster.
///
/// The base URL is always normalized to end with `/`. The password is never
/// printed by `Debug` and never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterDescriptor {
    id: String,
    name: String,
    base_url: String,
    username: String,
    password: String,
    active: bool,
    version: u64,
}

impl ClusterDescriptor {
    /// Create an active descriptor, normalizing and validating the base URL
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ProxyError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ProxyError::Validation("cluster id must not be blank".to_string()));
        }

        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            id,
            name: name.into(),
            username: username.into(),
            password: password.into(),
            active: true,
            version: 0,
        })
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the directory revision this descriptor was read at
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the cluster may currently be reached through the proxy
    pub fn is_accessible(&self) -> bool {
        self.active
    }

    /// Hash of everything a built HTTP client depends on
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.base_url.hash(&mut hasher);
        0u8.hash(&mut hasher);
        self.username.hash(&mut hasher);
        0u8.hash(&mut hasher);
        self.password.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Debug for ClusterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("active", &self.active)
            .field("version", &self.version)
            .finish()
    }
}

/// Trim, validate, and append the trailing slash to a management API URL
pub fn normalize_base_url(raw: &str) -> Result<String, ProxyError> {
    let trimmed = raw.trim();
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| ProxyError::Validation(format!("invalid cluster URL: {}", e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ProxyError::Validation(format!(
            "unsupported cluster URL scheme '{}'",
            parsed.scheme()
        )));
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(ProxyError::Validation(
            "cluster URL must not embed credentials".to_string(),
        ));
    }

    if trimmed.ends_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}/", trimmed))
    }
}

/// Closed set of caller roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Administrator,
    User,
}

impl Role {
    /// Administrators reach every cluster without an explicit assignment
    pub fn bypasses_assignment(self) -> bool {
        matches!(self, Role::Administrator)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Administrator => "ADMINISTRATOR",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved caller identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            role,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// Outcome of an access check for one `(identity, cluster)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl AccessDecision {
    /// Decide access from the caller's role and whether an assignment exists.
    ///
    /// Pure function: the assignment flag is ignored for administrators.
    pub fn evaluate(role: Role, has_assignment: bool) -> Self {
        if role.bypasses_assignment() || has_assignment {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny
        }
    }

    pub fn is_allowed(self) -> bool {
        self == AccessDecision::Allow
    }
}

/// Broker resource families shared by audit and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    Connection,
    Channel,
    Exchange,
    Queue,
    Binding,
    Message,
    Overview,
    Vhost,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Connection => "CONNECTION",
            ResourceType::Channel => "CHANNEL",
            ResourceType::Exchange => "EXCHANGE",
            ResourceType::Queue => "QUEUE",
            ResourceType::Binding => "BINDING",
            ResourceType::Message => "MESSAGE",
            ResourceType::Overview => "OVERVIEW",
            ResourceType::Vhost => "VHOST",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations recorded by audit and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    List,
    Get,
    Create,
    Delete,
    Purge,
    Publish,
    Consume,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "LIST",
            Operation::Get => "GET",
            Operation::Create => "CREATE",
            Operation::Delete => "DELETE",
            Operation::Purge => "PURGE",
            Operation::Publish => "PUBLISH",
            Operation::Consume => "CONSUME",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-cluster health state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Unknown,
    Healthy,
    Unhealthy,
}

/// Result of one health check. Replaced wholesale on every check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub cluster_id: String,
    pub cluster_name: String,
    pub healthy: bool,
    pub message: String,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl HealthStatus {
    pub fn healthy(descriptor: &ClusterDescriptor, message: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            cluster_id: descriptor.id().to_string(),
            cluster_name: descriptor.name().to_string(),
            healthy: true,
            message: message.into(),
            checked_at: Utc::now(),
            latency_ms: Some(latency_ms),
        }
    }

    pub fn unhealthy(descriptor: &ClusterDescriptor, message: impl Into<String>) -> Self {
        Self {
            cluster_id: descriptor.id().to_string(),
            cluster_name: descriptor.name().to_string(),
            healthy: false,
            message: message.into(),
            checked_at: Utc::now(),
            latency_ms: None,
        }
    }

    pub fn state(&self) -> HealthState {
        if self.healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        }
    }
}

/// Aggregate status across all checked clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Unknown,
    Up,
    Down,
    Degraded,
}

impl OverallStatus {
    /// Derive the aggregate from the cached per-cluster statuses
    pub fn from_statuses<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a HealthStatus>,
    {
        let (total, healthy) = statuses
            .into_iter()
            .fold((0usize, 0usize), |(total, healthy), status| {
                (total + 1, healthy + usize::from(status.healthy))
            });

        if total == 0 {
            OverallStatus::Unknown
        } else if healthy == total {
            OverallStatus::Up
        } else if healthy == 0 {
            OverallStatus::Down
        } else {
            OverallStatus::Degraded
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallStatus::Unknown => "UNKNOWN",
            OverallStatus::Up => "UP",
            OverallStatus::Down => "DOWN",
            OverallStatus::Degraded => "DEGRADED",
        };
        f.write_str(s)
    }
}

/// Snapshot of the health cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallHealth {
    pub status: OverallStatus,
    pub total: usize,
    pub healthy: usize,
    pub clusters: Vec<HealthStatus>,
}

impl OverallHealth {
    pub fn from_statuses(mut clusters: Vec<HealthStatus>) -> Self {
        clusters.sort_by(|a, b| a.cluster_id.cmp(&b.cluster_id));
        Self {
            status: OverallStatus::from_statuses(&clusters),
            total: clusters.len(),
            healthy: clusters.iter().filter(|s| s.healthy).count(),
            clusters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str) -> ClusterDescriptor {
        ClusterDescriptor::new(id, id, "http://localhost:15672", "guest", "secret").unwrap()
    }

    #[test]
    fn test_base_url_normalized() {
        let d = descriptor("c1");
        assert_eq!(d.base_url(), "http://localhost:15672/");

        let d = ClusterDescriptor::new("c2", "c2", " https://mq.local/rabbit/ ", "u", "p").unwrap();
        assert_eq!(d.base_url(), "https://mq.local/rabbit/");
    }

    #[test]
    fn test_base_url_rejected() {
        assert!(ClusterDescriptor::new("c", "c", "ftp://host", "u", "p").is_err());
        assert!(ClusterDescriptor::new("c", "c", "not a url", "u", "p").is_err());
        assert!(ClusterDescriptor::new("c", "c", "http://u:p@host", "u", "p").is_err());
        assert!(ClusterDescriptor::new(" ", "c", "http://host", "u", "p").is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", descriptor("c1"));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_fingerprint_tracks_credentials() {
        let a = descriptor("c1");
        let b = ClusterDescriptor::new("c1", "renamed", "http://localhost:15672/", "guest", "secret")
            .unwrap();
        let c = ClusterDescriptor::new("c1", "c1", "http://localhost:15672", "guest", "other")
            .unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_access_decision() {
        assert!(AccessDecision::evaluate(Role::Administrator, false).is_allowed());
        assert!(AccessDecision::evaluate(Role::Administrator, true).is_allowed());
        assert!(AccessDecision::evaluate(Role::User, true).is_allowed());
        assert_eq!(
            AccessDecision::evaluate(Role::User, false),
            AccessDecision::Deny
        );
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(
            serde_json::to_string(&Role::Administrator).unwrap(),
            "\"ADMINISTRATOR\""
        );
        let role: Role = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_overall_status() {
        let d = descriptor("c1");
        let up = HealthStatus::healthy(&d, "ok", 3);
        let down = HealthStatus::unhealthy(&d, "refused");

        assert_eq!(OverallStatus::from_statuses(std::iter::empty()), OverallStatus::Unknown);
        assert_eq!(OverallStatus::from_statuses([&up, &up]), OverallStatus::Up);
        assert_eq!(OverallStatus::from_statuses([&down]), OverallStatus::Down);
        assert_eq!(
            OverallStatus::from_statuses([&up, &down]),
            OverallStatus::Degraded
        );
    }

    #[test]
    fn test_overall_health_counts() {
        let a = descriptor("a");
        let b = descriptor("b");
        let health = OverallHealth::from_statuses(vec![
            HealthStatus::unhealthy(&b, "down"),
            HealthStatus::healthy(&a, "ok", 1),
        ]);

        assert_eq!(health.status, OverallStatus::Degraded);
        assert_eq!(health.total, 2);
        assert_eq!(health.healthy, 1);
        assert_eq!(health.clusters[0].cluster_id, "a");
    }
}
