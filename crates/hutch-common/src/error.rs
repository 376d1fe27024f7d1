//! Error types for Hutch
//!
//! This module defines:
//! - `ProxyError`: the stable failure taxonomy surfaced by every proxied call
//! - `error_kind`: labels used for audit records and metric dimensions

use crate::model::{Operation, ResourceType};

/// Boxed error used to preserve the original cause of a failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for proxied operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Stable error kind labels
pub mod error_kind {
    pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
    pub const CLUSTER_NOT_FOUND: &str = "CLUSTER_NOT_FOUND";
    pub const CLUSTER_INACTIVE: &str = "CLUSTER_INACTIVE";
    pub const UPSTREAM_AUTH_FAILED: &str = "UPSTREAM_AUTH_FAILED";
    pub const UPSTREAM_FORBIDDEN: &str = "UPSTREAM_FORBIDDEN";
    pub const UPSTREAM_NOT_FOUND: &str = "UPSTREAM_NOT_FOUND";
    pub const UPSTREAM_SERVER_ERROR: &str = "UPSTREAM_SERVER_ERROR";
    pub const CONNECT_FAILURE: &str = "CONNECT_FAILURE";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const RESPONSE_PARSE_FAILURE: &str = "RESPONSE_PARSE_FAILURE";
    pub const VALIDATION: &str = "VALIDATION";
    pub const RESOURCE_OPERATION: &str = "RESOURCE_OPERATION";
    pub const UNEXPECTED: &str = "UNEXPECTED";
}

/// Failures of a proxied cluster call.
///
/// Access and validation variants are produced before any upstream request is
/// attempted. Transport and HTTP variants are produced at the client boundary
/// and keep the original cause as their `source`. No variant ever carries
/// cluster credentials.
#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("cluster '{0}' not found")]
    ClusterNotFound(String),

    #[error("cluster '{0}' is inactive")]
    ClusterInactive(String),

    #[error("authentication against cluster '{cluster_id}' failed")]
    UpstreamAuthFailed { cluster_id: String },

    #[error("cluster '{cluster_id}' refused the request: {message}")]
    UpstreamForbidden { cluster_id: String, message: String },

    #[error("resource not found on cluster '{cluster_id}': {message}")]
    UpstreamNotFound { cluster_id: String, message: String },

    #[error("cluster '{cluster_id}' returned server error {status}: {message}")]
    UpstreamServerError {
        cluster_id: String,
        status: u16,
        message: String,
    },

    #[error("cannot connect to cluster '{cluster_id}'")]
    ConnectFailure {
        cluster_id: String,
        #[source]
        source: BoxError,
    },

    #[error("request to cluster '{cluster_id}' timed out")]
    Timeout {
        cluster_id: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("unreadable response from cluster '{cluster_id}'")]
    ResponseParseFailure {
        cluster_id: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{operation} {resource_type} failed: {source}")]
    ResourceOperation {
        resource_type: ResourceType,
        operation: Operation,
        #[source]
        source: BoxError,
    },

    #[error("unexpected error on cluster '{cluster_id}': {message}")]
    Unexpected {
        cluster_id: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl ProxyError {
    /// Wrap a decode failure of an upstream payload
    pub fn resource_operation(
        resource_type: ResourceType,
        operation: Operation,
        source: impl Into<BoxError>,
    ) -> Self {
        ProxyError::ResourceOperation {
            resource_type,
            operation,
            source: source.into(),
        }
    }

    pub fn unexpected(cluster_id: &str, message: impl Into<String>) -> Self {
        ProxyError::Unexpected {
            cluster_id: cluster_id.to_string(),
            message: message.into(),
            source: None,
        }
    }

    /// Stable label of this failure, used for audit and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::AccessDenied(_) => error_kind::ACCESS_DENIED,
            ProxyError::ClusterNotFound(_) => error_kind::CLUSTER_NOT_FOUND,
            ProxyError::ClusterInactive(_) => error_kind::CLUSTER_INACTIVE,
            ProxyError::UpstreamAuthFailed { .. } => error_kind::UPSTREAM_AUTH_FAILED,
            ProxyError::UpstreamForbidden { .. } => error_kind::UPSTREAM_FORBIDDEN,
            ProxyError::UpstreamNotFound { .. } => error_kind::UPSTREAM_NOT_FOUND,
            ProxyError::UpstreamServerError { .. } => error_kind::UPSTREAM_SERVER_ERROR,
            ProxyError::ConnectFailure { .. } => error_kind::CONNECT_FAILURE,
            ProxyError::Timeout { .. } => error_kind::TIMEOUT,
            ProxyError::ResponseParseFailure { .. } => error_kind::RESPONSE_PARSE_FAILURE,
            ProxyError::Validation(_) => error_kind::VALIDATION,
            ProxyError::ResourceOperation { .. } => error_kind::RESOURCE_OPERATION,
            ProxyError::Unexpected { .. } => error_kind::UNEXPECTED,
        }
    }

    /// HTTP status a presentation layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::AccessDenied(_) => 403,
            ProxyError::ClusterNotFound(_) => 404,
            ProxyError::ClusterInactive(_) => 409,
            ProxyError::UpstreamAuthFailed { .. } => 502,
            ProxyError::UpstreamForbidden { .. } => 403,
            ProxyError::UpstreamNotFound { .. } => 404,
            ProxyError::UpstreamServerError { .. } => 502,
            ProxyError::ConnectFailure { .. } => 503,
            ProxyError::Timeout { .. } => 504,
            ProxyError::ResponseParseFailure { .. } => 502,
            ProxyError::Validation(_) => 400,
            ProxyError::ResourceOperation { .. } => 502,
            ProxyError::Unexpected { .. } => 500,
        }
    }

    /// True for failures raised before any upstream request was sent
    pub fn is_rejected_locally(&self) -> bool {
        matches!(
            self,
            ProxyError::AccessDenied(_)
                | ProxyError::ClusterNotFound(_)
                | ProxyError::ClusterInactive(_)
                | ProxyError::Validation(_)
        )
    }
}

impl From<validator::ValidationErrors> for ProxyError {
    fn from(value: validator::ValidationErrors) -> Self {
        ProxyError::Validation(value.to_string())
    }
}
