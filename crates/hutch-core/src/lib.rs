//! Hutch Core - access control, resource operations and health monitoring
//!
//! This crate provides:
//! - `ClusterProxy`: per-call access validation in front of the client pool
//! - `ResourceEngine`: paginated listings, binding lookups and write operations
//! - `HealthMonitor`: TTL-cached cluster health with a debounced global sweep
//! - Audit and metrics sinks invoked by the engine and the monitor
//! - In-memory directory and assignment implementations

pub mod audit;
pub mod health;
pub mod lifecycle;
pub mod memory;
pub mod metrics;
pub mod proxy;
pub mod resource;

pub use audit::{AuditEvent, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use health::{HealthMonitor, HealthMonitorConfig};
pub use lifecycle::ClusterLifecycle;
pub use memory::{InMemoryAssignments, InMemoryClusterDirectory};
pub use crate::metrics::{MetricsSink, NoopMetricsSink, RecorderMetricsSink};
pub use proxy::ClusterProxy;
pub use resource::ResourceEngine;
