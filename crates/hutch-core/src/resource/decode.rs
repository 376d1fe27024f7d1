//! Decoding of upstream payloads whose shape varies between broker versions

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use hutch_common::broker::PublishOutcome;
use hutch_common::{Operation, ProxyError, ResourceType};

/// A collection is either a bare array or a paged envelope
#[derive(Deserialize)]
#[serde(untagged)]
enum ListShape<T> {
    Plain(Vec<T>),
    Paged { items: Vec<T> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PublishShape {
    Typed(PublishOutcome),
    Generic(Map<String, Value>),
}

pub fn decode<T: DeserializeOwned>(
    value: Value,
    resource_type: ResourceType,
    operation: Operation,
) -> Result<T, ProxyError> {
    serde_json::from_value(value)
        .map_err(|e| ProxyError::resource_operation(resource_type, operation, e))
}

/// Decode a collection. `null` or any non-collection shape is an error.
pub fn decode_list<T: DeserializeOwned>(
    value: Value,
    resource_type: ResourceType,
    operation: Operation,
) -> Result<Vec<T>, ProxyError> {
    match decode::<ListShape<T>>(value, resource_type, operation)? {
        ListShape::Plain(items) | ListShape::Paged { items } => Ok(items),
    }
}

/// Decode a publish response into a single outcome type.
///
/// Falls back to reading `routed` out of a generic map, accepting a boolean or
/// its string form.
pub fn decode_publish(value: Value) -> Result<PublishOutcome, ProxyError> {
    let failed = |message: String| {
        ProxyError::resource_operation(ResourceType::Message, Operation::Publish, message)
    };

    // Untagged decoding would accept a sequence for the typed struct
    if !value.is_object() {
        return Err(failed(format!(
            "expected a publish result object, got {}",
            json_kind(&value)
        )));
    }

    match decode::<PublishShape>(value, ResourceType::Message, Operation::Publish)? {
        PublishShape::Typed(outcome) => Ok(outcome),
        PublishShape::Generic(map) => match map.get("routed") {
            Some(Value::Bool(routed)) => Ok(PublishOutcome { routed: *routed }),
            Some(Value::String(s)) => s
                .parse::<bool>()
                .map(|routed| PublishOutcome { routed })
                .map_err(|_| failed(format!("unrecognized routed flag '{}'", s))),
            Some(other) => Err(failed(format!("unrecognized routed flag {}", other))),
            None => Err(failed("publish response has no routed flag".to_string())),
        },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
