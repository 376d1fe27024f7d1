//! Broker resource models as returned by the management API
//!
//! Upstream field names are snake_case. Only the fields the console relies on
//! are typed; everything else the broker reports is kept in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub name: String,
    #[serde(default)]
    pub vhost: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub channels: Option<u64>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub peer_host: Option<String>,
    #[serde(default)]
    pub peer_port: Option<u16>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub vhost: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub consumer_count: Option<u64>,
    #[serde(default)]
    pub messages_unacknowledged: Option<u64>,
    #[serde(default)]
    pub prefetch_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// Empty for the default exchange
    pub name: String,
    pub vhost: String,
    #[serde(rename = "type")]
    pub exchange_type: String,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    pub name: String,
    pub vhost: String,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub messages: Option<u64>,
    #[serde(default)]
    pub messages_ready: Option<u64>,
    #[serde(default)]
    pub messages_unacknowledged: Option<u64>,
    #[serde(default)]
    pub consumers: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub source: String,
    pub vhost: String,
    pub destination: String,
    pub destination_type: String,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(default)]
    pub properties_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vhost {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tracing: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A message fetched from a queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub payload_bytes: u64,
    #[serde(default)]
    pub payload_encoding: String,
    #[serde(default)]
    pub redelivered: bool,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub routing_key: String,
    /// Messages left in the queue after this one was fetched
    #[serde(default)]
    pub message_count: u64,
    /// Some broker versions report an empty array instead of an empty object
    #[serde(default)]
    pub properties: Value,
}

/// Normalized result of a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Whether the broker routed the message to at least one queue
    pub routed: bool,
}

/// Cluster-wide overview used for health checks and dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub rabbitmq_version: Option<String>,
    #[serde(default)]
    pub management_version: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub object_totals: Map<String, Value>,
    #[serde(default)]
    pub queue_totals: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_queue_decode_keeps_unknown_fields() {
        let queue: Queue = serde_json::from_value(json!({
            "name": "orders",
            "vhost": "/",
            "durable": true,
            "auto_delete": false,
            "messages": 12,
            "type": "quorum"
        }))
        .unwrap();

        assert_eq!(queue.name, "orders");
        assert_eq!(queue.messages, Some(12));
        assert_eq!(queue.extra.get("type"), Some(&json!("quorum")));
    }

    #[test]
    fn test_exchange_type_rename() {
        let exchange: Exchange = serde_json::from_value(json!({
            "name": "",
            "vhost": "/",
            "type": "direct",
            "durable": true
        }))
        .unwrap();

        assert_eq!(exchange.exchange_type, "direct");
        assert!(exchange.name.is_empty());
    }

    #[test]
    fn test_message_properties_shape() {
        let message: Message = serde_json::from_value(json!({
            "payload": "hello",
            "payload_bytes": 5,
            "payload_encoding": "string",
            "redelivered": false,
            "exchange": "",
            "routing_key": "q1",
            "message_count": 0,
            "properties": []
        }))
        .unwrap();

        assert_eq!(message.payload, "hello");
        assert!(message.properties.is_array());
    }
}
