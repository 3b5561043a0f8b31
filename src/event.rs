//! User lifecycle events as open JSON mappings.
//!
//! Events arrive on the wire as JSON objects with an open schema. The only
//! structural requirement this module enforces is that the payload is a JSON
//! object; everything else (which fields exist, what types they carry) is the
//! concern of the handler that processes the event.
//!
//! The type discriminator lives in the `event` field:
//!
//! ```json
//! { "event": "UserCreated", "id": 42, "name": "Ada", "email": "a@x.com" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Name of the field carrying the event type discriminator.
pub const EVENT_TYPE_FIELD: &str = "event";

/// Errors produced while decoding an event payload.
#[derive(Error, Debug)]
pub enum EventError {
    /// The payload was not valid JSON.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The payload was valid JSON but not a JSON object.
    #[error("event payload must be a JSON object, got {0}")]
    NotAnObject(String),
}

/// A single lifecycle event: an open key-value mapping decoded from one
/// message payload.
///
/// Events are transient: created by deserializing one message, dropped after
/// dispatch. The `event` field identifies which handler serves the event; its
/// absence is detected by the consumers, not here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: serde_json::Map<String, Value>,
}

impl Event {
    /// Create an event from an already-parsed JSON object.
    #[must_use]
    pub const fn new(fields: serde_json::Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Decode an event from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidJson`] if the bytes are not valid JSON and
    /// [`EventError::NotAnObject`] if they decode to anything other than a
    /// JSON object.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, EventError> {
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(EventError::NotAnObject(type_name(&other).to_string())),
        }
    }

    /// The event type discriminator, if present and a string.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.fields.get(EVENT_TYPE_FIELD).and_then(Value::as_str)
    }

    /// Raw access to a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A field rendered as display text: strings come back without quotes,
    /// any other value through its JSON representation (so `"id": 42`
    /// renders as `42`).
    #[must_use]
    pub fn get_as_string(&self, key: &str) -> Option<String> {
        self.fields.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event {{ type: {}, fields: {} }}",
            self.event_type().unwrap_or("<missing>"),
            self.fields.len()
        )
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::panic)] // Panics: tests fail loudly on bad fixtures
mod tests {
    use super::*;
    use serde_json::json;

    fn event_from(value: serde_json::Value) -> Event {
        match value {
            Value::Object(fields) => Event::new(fields),
            _ => panic!("test events are objects"),
        }
    }

    #[test]
    fn decodes_json_object_payload() {
        let event = Event::from_json_bytes(br#"{"event":"UserCreated","id":42}"#)
            .expect("valid payload should decode");

        assert_eq!(event.event_type(), Some("UserCreated"));
        assert_eq!(event.get("id"), Some(&json!(42)));
    }

    #[test]
    fn rejects_invalid_json() {
        let result = Event::from_json_bytes(b"not json at all");
        assert!(matches!(result, Err(EventError::InvalidJson(_))));
    }

    #[test]
    fn rejects_non_object_payload() {
        let result = Event::from_json_bytes(b"[1, 2, 3]");
        assert!(matches!(result, Err(EventError::NotAnObject(_))));
    }

    #[test]
    fn event_type_absent_when_field_missing_or_not_a_string() {
        assert_eq!(event_from(json!({"id": 1})).event_type(), None);
        assert_eq!(event_from(json!({"event": 7})).event_type(), None);
    }

    #[test]
    fn get_as_string_renders_numbers_without_quotes() {
        let event = event_from(json!({"id": 42, "name": "Ada"}));

        assert_eq!(event.get_as_string("id").as_deref(), Some("42"));
        assert_eq!(event.get_as_string("name").as_deref(), Some("Ada"));
        assert_eq!(event.get_as_string("missing"), None);
    }

    #[test]
    fn serializes_transparently_as_a_mapping() {
        let event = event_from(json!({"event": "UserDeleted", "id": 1}));
        let text = serde_json::to_string(&event).expect("serialization should succeed");

        assert_eq!(text, r#"{"event":"UserDeleted","id":1}"#);
    }
}
