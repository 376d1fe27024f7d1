//! Broker management API paths
//!
//! Every path segment naming a vhost or resource is percent-encoded here, once.
//! The default vhost `/` becomes the literal token `%2F`. Built paths must be
//! appended to the cluster base URL verbatim; running them through another URL
//! encoder would turn `%2F` into `%252F`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Name of the default vhost
pub const DEFAULT_VHOST: &str = "/";

/// Encoded form of the default vhost
pub const DEFAULT_VHOST_TOKEN: &str = "%2F";

/// Name the management API uses for the nameless default exchange
pub const DEFAULT_EXCHANGE: &str = "amq.default";

pub const OVERVIEW: &str = "/api/overview";
pub const CONNECTIONS: &str = "/api/connections";
pub const CHANNELS: &str = "/api/channels";
pub const EXCHANGES: &str = "/api/exchanges";
pub const QUEUES: &str = "/api/queues";
pub const BINDINGS: &str = "/api/bindings";
pub const VHOSTS: &str = "/api/vhosts";

/// Encode a vhost for use as a path segment
pub fn encode_vhost(vhost: &str) -> Cow<'_, str> {
    if vhost == DEFAULT_VHOST {
        Cow::Borrowed(DEFAULT_VHOST_TOKEN)
    } else {
        encode_segment(vhost)
    }
}

/// Percent-encode a resource name for use as a path segment
pub fn encode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::encode(segment)
}

/// Destination kinds of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    Queue,
    Exchange,
}

impl DestinationType {
    /// Single-letter token used in binding paths
    pub fn path_token(self) -> &'static str {
        match self {
            DestinationType::Queue => "q",
            DestinationType::Exchange => "e",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DestinationType::Queue => "queue",
            DestinationType::Exchange => "exchange",
        }
    }
}

#[derive(Serialize)]
struct NameFilter<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_regex: bool,
}

/// Collection path, optionally filtered by name
pub fn filtered(collection: &str, name: Option<&str>, use_regex: bool) -> String {
    match name {
        Some(name) => {
            let query = serde_urlencoded::to_string(NameFilter { name, use_regex })
                .unwrap_or_default();
            format!("{}?{}", collection, query)
        }
        None => collection.to_string(),
    }
}

/// Append a query string built from `query`, if it renders to anything
pub fn with_query<Q: Serialize>(path: String, query: &Q) -> String {
    match serde_urlencoded::to_string(query) {
        Ok(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path,
    }
}

pub fn exchange(vhost: &str, name: &str) -> String {
    format!(
        "{}/{}/{}",
        EXCHANGES,
        encode_vhost(vhost),
        encode_segment(name)
    )
}

pub fn exchange_source_bindings(vhost: &str, name: &str) -> String {
    format!("{}/bindings/source", exchange(vhost, name))
}

pub fn exchange_destination_bindings(vhost: &str, name: &str) -> String {
    format!("{}/bindings/destination", exchange(vhost, name))
}

pub fn exchange_publish(vhost: &str, name: &str) -> String {
    format!("{}/publish", exchange(vhost, name))
}

pub fn queue(vhost: &str, name: &str) -> String {
    format!("{}/{}/{}", QUEUES, encode_vhost(vhost), encode_segment(name))
}

pub fn queue_bindings(vhost: &str, name: &str) -> String {
    format!("{}/bindings", queue(vhost, name))
}

pub fn queue_contents(vhost: &str, name: &str) -> String {
    format!("{}/contents", queue(vhost, name))
}

pub fn queue_get(vhost: &str, name: &str) -> String {
    format!("{}/get", queue(vhost, name))
}

/// Path creating a binding from exchange `source` to `destination`
pub fn binding(
    vhost: &str,
    source: &str,
    destination_type: DestinationType,
    destination: &str,
) -> String {
    format!(
        "{}/{}/e/{}/{}/{}",
        BINDINGS,
        encode_vhost(vhost),
        encode_segment(source),
        destination_type.path_token(),
        encode_segment(destination)
    )
}
