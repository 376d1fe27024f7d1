//! Write-operation requests and their upstream wire bodies
//!
//! Callers use camelCase field names. `upstream_body` translates each request
//! into the management API's snake_case convention.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use validator::{Validate, ValidationError};

use crate::api_path::{DEFAULT_EXCHANGE, DEFAULT_VHOST, DestinationType};

/// Most messages fetched by one get-messages call
pub const MAX_FETCH_COUNT: u32 = 1000;

const BUILTIN_EXCHANGE_TYPES: &[&str] = &["direct", "fanout", "topic", "headers"];

fn default_vhost() -> String {
    DEFAULT_VHOST.to_string()
}

fn default_true() -> bool {
    true
}

fn default_fetch_count() -> u32 {
    1
}

/// Built-in exchange types plus plugin types, which are prefixed with `x-`
pub fn validate_exchange_type(value: &str) -> Result<(), ValidationError> {
    if BUILTIN_EXCHANGE_TYPES.contains(&value) || (value.starts_with("x-") && value.len() > 2) {
        Ok(())
    } else {
        Err(ValidationError::new("exchange_type_unknown"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExchangeRequest {
    #[serde(default = "default_vhost")]
    #[validate(length(min = 1))]
    pub vhost: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_exchange_type"))]
    pub exchange_type: String,
    #[serde(default = "default_true")]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl CreateExchangeRequest {
    pub fn new(vhost: &str, name: &str, exchange_type: &str) -> Self {
        Self {
            vhost: vhost.to_string(),
            name: name.to_string(),
            exchange_type: exchange_type.to_string(),
            durable: true,
            auto_delete: false,
            internal: false,
            arguments: Map::new(),
        }
    }

    pub fn upstream_body(&self) -> Value {
        json!({
            "type": self.exchange_type,
            "durable": self.durable,
            "auto_delete": self.auto_delete,
            "internal": self.internal,
            "arguments": self.arguments,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteExchangeRequest {
    #[serde(default = "default_vhost")]
    #[validate(length(min = 1))]
    pub vhost: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Refuse to delete an exchange that still has bindings
    #[serde(default)]
    pub if_unused: bool,
}

impl DeleteExchangeRequest {
    pub fn new(vhost: &str, name: &str) -> Self {
        Self {
            vhost: vhost.to_string(),
            name: name.to_string(),
            if_unused: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueueRequest {
    #[serde(default = "default_vhost")]
    #[validate(length(min = 1))]
    pub vhost: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default = "default_true")]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Node to place the queue leader on
    #[serde(default)]
    pub node: Option<String>,
}

impl CreateQueueRequest {
    pub fn new(vhost: &str, name: &str) -> Self {
        Self {
            vhost: vhost.to_string(),
            name: name.to_string(),
            durable: true,
            auto_delete: false,
            arguments: Map::new(),
            node: None,
        }
    }

    pub fn upstream_body(&self) -> Value {
        let mut body = json!({
            "durable": self.durable,
            "auto_delete": self.auto_delete,
            "arguments": self.arguments,
        });
        if let Some(node) = &self.node {
            body["node"] = Value::String(node.clone());
        }
        body
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQueueRequest {
    #[serde(default = "default_vhost")]
    #[validate(length(min = 1))]
    pub vhost: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Refuse to delete a queue that has consumers
    #[serde(default)]
    pub if_unused: bool,
    /// Refuse to delete a queue that still holds messages
    #[serde(default)]
    pub if_empty: bool,
}

impl DeleteQueueRequest {
    pub fn new(vhost: &str, name: &str) -> Self {
        Self {
            vhost: vhost.to_string(),
            name: name.to_string(),
            if_unused: false,
            if_empty: false,
        }
    }
}

/// Identifies one queue, e.g. for purging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QueueRef {
    #[serde(default = "default_vhost")]
    #[validate(length(min = 1))]
    pub vhost: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

impl QueueRef {
    pub fn new(vhost: &str, name: &str) -> Self {
        Self {
            vhost: vhost.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBindingRequest {
    #[serde(default = "default_vhost")]
    #[validate(length(min = 1))]
    pub vhost: String,
    /// Source exchange
    #[validate(length(min = 1, max = 255))]
    pub source: String,
    #[validate(length(min = 1, max = 255))]
    pub destination: String,
    pub destination_type: DestinationType,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl CreateBindingRequest {
    pub fn to_queue(vhost: &str, source: &str, queue: &str, routing_key: &str) -> Self {
        Self {
            vhost: vhost.to_string(),
            source: source.to_string(),
            destination: queue.to_string(),
            destination_type: DestinationType::Queue,
            routing_key: routing_key.to_string(),
            arguments: Map::new(),
        }
    }

    pub fn upstream_body(&self) -> Value {
        json!({
            "routing_key": self.routing_key,
            "arguments": self.arguments,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    #[default]
    String,
    Base64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PublishMessageRequest {
    #[serde(default = "default_vhost")]
    #[validate(length(min = 1))]
    pub vhost: String,
    /// Target exchange; empty means the default exchange
    #[serde(default)]
    #[validate(length(max = 255))]
    pub exchange: String,
    #[serde(default)]
    pub routing_key: String,
    pub payload: String,
    #[serde(default)]
    pub payload_encoding: PayloadEncoding,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl PublishMessageRequest {
    pub fn new(vhost: &str, exchange: &str, routing_key: &str, payload: &str) -> Self {
        Self {
            vhost: vhost.to_string(),
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            payload: payload.to_string(),
            payload_encoding: PayloadEncoding::String,
            properties: Map::new(),
        }
    }

    /// Exchange name as the management API expects it
    pub fn upstream_exchange(&self) -> &str {
        if self.exchange.is_empty() {
            DEFAULT_EXCHANGE
        } else {
            &self.exchange
        }
    }

    pub fn upstream_body(&self) -> Value {
        json!({
            "properties": self.properties,
            "routing_key": self.routing_key,
            "payload": self.payload,
            "payload_encoding": self.payload_encoding,
        })
    }
}

/// What the broker does with fetched messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    #[default]
    AckRequeueTrue,
    AckRequeueFalse,
    RejectRequeueTrue,
    RejectRequeueFalse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageEncoding {
    #[default]
    Auto,
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetMessagesRequest {
    #[serde(default = "default_vhost")]
    #[validate(length(min = 1))]
    pub vhost: String,
    #[validate(length(min = 1, max = 255))]
    pub queue: String,
    #[serde(default = "default_fetch_count")]
    #[validate(range(min = 1, max = 1000))]
    pub count: u32,
    #[serde(default)]
    pub ackmode: AckMode,
    #[serde(default)]
    pub encoding: MessageEncoding,
    /// Truncate payloads longer than this many bytes
    #[serde(default)]
    pub truncate: Option<u64>,
}

impl GetMessagesRequest {
    pub fn new(vhost: &str, queue: &str, count: u32) -> Self {
        Self {
            vhost: vhost.to_string(),
            queue: queue.to_string(),
            count,
            ackmode: AckMode::default(),
            encoding: MessageEncoding::default(),
            truncate: None,
        }
    }

    pub fn upstream_body(&self) -> Value {
        let mut body = json!({
            "count": self.count,
            "ackmode": self.ackmode,
            "encoding": self.encoding,
        });
        if let Some(truncate) = self.truncate {
            body["truncate"] = Value::from(truncate);
        }
        body
    }
}
