//! Hutch Common - Shared types, traits, and utilities
//!
//! This crate provides the foundational types used across all Hutch components:
//! - The proxy error taxonomy
//! - Cluster descriptors, identities, and health values
//! - Client-side pagination
//! - Management API path construction and vhost encoding
//! - Broker resource models and write requests
//! - Collaborator traits for the cluster directory and assignments

pub mod api_path;
pub mod broker;
pub mod error;
pub mod model;
pub mod pagination;
pub mod request;
pub mod traits;

// Re-exports for convenience
pub use error::{BoxError, ProxyError, Result};
pub use model::{
    AccessDecision, ClusterDescriptor, HealthState, HealthStatus, Identity, Operation,
    OverallHealth, OverallStatus, ResourceType, Role,
};
pub use pagination::{PagedResponse, PaginationRequest, paginate};
pub use traits::{AssignmentLookup, ClusterDirectory};
