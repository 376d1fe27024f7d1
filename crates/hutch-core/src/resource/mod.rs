//! Resource query engine
//!
//! Typed broker operations on top of [`ClusterProxy`]. The engine holds no
//! state of its own: every call validates the request, goes through the proxy,
//! decodes the response and reports the outcome to the audit and metrics sinks.

mod decode;
mod read;
mod write;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use hutch_common::{Identity, Operation, ProxyError, ResourceType, Role};

use crate::audit::{AuditEvent, AuditSink};
use crate::metrics::MetricsSink;
use crate::proxy::ClusterProxy;

pub use decode::{decode, decode_list, decode_publish};
pub use write::DeleteConditions;

/// Name recorded for calls made without an identity
pub const ANONYMOUS: &str = "anonymous";

pub struct ResourceEngine {
    proxy: Arc<ClusterProxy>,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<dyn MetricsSink>,
}

/// What is being done, to what, and by whom
struct OperationContext<'a> {
    cluster_id: &'a str,
    identity: Option<&'a Identity>,
    resource_type: ResourceType,
    operation: Operation,
    parameters: Value,
}

impl ResourceEngine {
    pub fn new(
        proxy: Arc<ClusterProxy>,
        audit: Arc<dyn AuditSink>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            proxy,
            audit,
            metrics,
        }
    }

    pub fn proxy(&self) -> &Arc<ClusterProxy> {
        &self.proxy
    }

    /// Run `operation` and report its outcome. The result is returned as is.
    async fn instrumented<T, F>(&self, ctx: OperationContext<'_>, operation: F) -> Result<T, ProxyError>
    where
        F: Future<Output = Result<T, ProxyError>>,
    {
        let started = Instant::now();
        let result = operation.await;
        self.observe(ctx, started.elapsed(), &result);
        result
    }

    fn observe<T>(&self, ctx: OperationContext<'_>, elapsed: Duration, result: &Result<T, ProxyError>) {
        let anonymous;
        let identity = match ctx.identity {
            Some(identity) => identity,
            None => {
                anonymous = Identity::new("", ANONYMOUS, Role::User);
                &anonymous
            }
        };

        self.metrics.record_cluster_access(ctx.cluster_id);
        self.metrics.record_user_access(&identity.username);

        let event = AuditEvent::builder(identity, ctx.cluster_id, ctx.resource_type, ctx.operation)
            .parameters(ctx.parameters);

        match result {
            Ok(_) => {
                self.metrics
                    .record_operation_duration(ctx.resource_type, ctx.operation, elapsed);
                debug!(
                    cluster_id = ctx.cluster_id,
                    resource_type = %ctx.resource_type,
                    operation = %ctx.operation,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Resource operation completed"
                );
                self.audit.record(event.success().build());
            }
            Err(e) => {
                self.metrics
                    .record_operation_error(ctx.resource_type, ctx.operation, e.kind());
                warn!(
                    cluster_id = ctx.cluster_id,
                    resource_type = %ctx.resource_type,
                    operation = %ctx.operation,
                    kind = e.kind(),
                    error = %e,
                    "Resource operation failed"
                );
                self.audit.record(event.failure(e.to_string(), e.kind()).build());
            }
        }
    }
}
