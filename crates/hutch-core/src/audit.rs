//! Audit events for proxied resource operations
//!
//! Sinks are fire-and-forget: recording never returns an error and never
//! changes the outcome of the operation being audited.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use hutch_common::{Identity, Operation, ResourceType};

/// Outcome labels
pub mod result {
    pub const SUCCESS: &str = "SUCCESS";
    pub const FAILURE: &str = "FAILURE";
}

/// One audited resource operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub identity_id: String,
    pub username: String,
    pub cluster_id: String,
    pub resource_type: ResourceType,
    pub operation: Operation,
    pub success: bool,
    /// Operation parameters. Never contains credentials or message payloads.
    pub parameters: Value,
    pub error_message: Option<String>,
    pub error_kind: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn builder(
        identity: &Identity,
        cluster_id: &str,
        resource_type: ResourceType,
        operation: Operation,
    ) -> AuditEventBuilder {
        AuditEventBuilder {
            event: AuditEvent {
                identity_id: identity.id.clone(),
                username: identity.username.clone(),
                cluster_id: cluster_id.to_string(),
                resource_type,
                operation,
                success: true,
                parameters: Value::Null,
                error_message: None,
                error_kind: None,
                timestamp: Utc::now(),
            },
        }
    }

    pub fn result(&self) -> &'static str {
        if self.success {
            result::SUCCESS
        } else {
            result::FAILURE
        }
    }
}

/// Builder for AuditEvent
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    pub fn parameters(mut self, parameters: Value) -> Self {
        self.event.parameters = parameters;
        self
    }

    pub fn success(mut self) -> Self {
        self.event.success = true;
        self.event.error_message = None;
        self.event.error_kind = None;
        self
    }

    pub fn failure(mut self, message: impl Into<String>, kind: impl Into<String>) -> Self {
        self.event.success = false;
        self.event.error_message = Some(message.into());
        self.event.error_kind = Some(kind.into());
        self
    }

    pub fn build(self) -> AuditEvent {
        self.event
    }
}

/// Receiver of audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);

    fn log_access(
        &self,
        identity: &Identity,
        cluster_id: &str,
        resource_type: ResourceType,
        operation: Operation,
        parameters: Value,
    ) {
        self.record(
            AuditEvent::builder(identity, cluster_id, resource_type, operation)
                .parameters(parameters)
                .success()
                .build(),
        );
    }

    fn log_access_failure(
        &self,
        identity: &Identity,
        cluster_id: &str,
        resource_type: ResourceType,
        operation: Operation,
        error_message: &str,
        error_kind: &str,
    ) {
        self.record(
            AuditEvent::builder(identity, cluster_id, resource_type, operation)
                .failure(error_message, error_kind)
                .build(),
        );
    }
}

/// Writes audit events as structured log records on the `hutch::audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        if event.success {
            info!(
                target: "hutch::audit",
                identity = %event.username,
                cluster_id = %event.cluster_id,
                resource_type = %event.resource_type,
                operation = %event.operation,
                result = event.result(),
                parameters = %event.parameters,
                "Resource access"
            );
        } else {
            warn!(
                target: "hutch::audit",
                identity = %event.username,
                cluster_id = %event.cluster_id,
                resource_type = %event.resource_type,
                operation = %event.operation,
                result = event.result(),
                parameters = %event.parameters,
                error_kind = event.error_kind.as_deref().unwrap_or_default(),
                error = event.error_message.as_deref().unwrap_or_default(),
                "Resource access failed"
            );
        }
    }
}

/// Keeps events in memory, for tests and diagnostics
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use hutch_common::Role;

    use super::*;

    fn identity() -> Identity {
        Identity::new("u1", "alice", Role::User)
    }

    #[test]
    fn test_builder_failure() {
        let event = AuditEvent::builder(&identity(), "c1", ResourceType::Queue, Operation::Delete)
            .parameters(json!({"vhost": "/", "name": "orders"}))
            .failure("not found", "UPSTREAM_NOT_FOUND")
            .build();

        assert!(!event.success);
        assert_eq!(event.result(), result::FAILURE);
        assert_eq!(event.error_kind.as_deref(), Some("UPSTREAM_NOT_FOUND"));
        assert_eq!(event.parameters["name"], "orders");
    }

    #[test]
    fn test_memory_sink_provided_methods() {
        let sink = MemoryAuditSink::new();
        sink.log_access(
            &identity(),
            "c1",
            ResourceType::Exchange,
            Operation::List,
            json!({"page": 1}),
        );
        sink.log_access_failure(
            &identity(),
            "c1",
            ResourceType::Exchange,
            Operation::Create,
            "denied",
            "ACCESS_DENIED",
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(events[0].success);
        assert_eq!(events[0].username, "alice");
        assert!(!events[1].success);
        assert_eq!(events[1].error_message.as_deref(), Some("denied"));
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event =
            AuditEvent::builder(&identity(), "c1", ResourceType::Queue, Operation::Purge).build();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["clusterId"], "c1");
        assert_eq!(value["resourceType"], "QUEUE");
        assert_eq!(value["operation"], "PURGE");
    }
}
