//! The status-tagged event relayed from the queue into the index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while decoding an event from its wire representation.
#[derive(Error, Debug)]
pub enum EventDecodeError {
    /// The bytes are not a valid JSON event.
    #[error("Invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The event has no id to key the index document on.
    #[error("Event id must not be empty")]
    MissingId,
}

/// An event received from the queue.
///
/// `id` is assigned by the producer and doubles as the index document key.
/// A missing `status_code` decodes as `0`, which is treated as success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Producer-assigned identifier, never empty.
    pub id: String,
    /// Opaque event body.
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Free-form string annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// HTTP-like status the producer attached to the event.
    #[serde(default)]
    pub status_code: i64,
}

impl Event {
    /// Create an event with an empty payload and no metadata.
    pub fn new(id: impl Into<String>, status_code: i64) -> Self {
        Self {
            id: id.into(),
            payload: Map::new(),
            metadata: BTreeMap::new(),
            status_code,
        }
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Decode an event from JSON bytes, rejecting events without an id.
    pub fn from_json(bytes: &[u8]) -> Result<Self, EventDecodeError> {
        let event: Event = serde_json::from_slice(bytes)?;
        if event.id.trim().is_empty() {
            return Err(EventDecodeError::MissingId);
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_event() {
        let raw = json!({
            "id": "msg-1",
            "payload": { "foo": "bar" },
            "metadata": { "source": "unit-test" },
            "status_code": 201
        });

        let event = Event::from_json(raw.to_string().as_bytes()).unwrap();

        assert_eq!(event.id, "msg-1");
        assert_eq!(event.payload["foo"], "bar");
        assert_eq!(event.metadata.get("source").map(String::as_str), Some("unit-test"));
        assert_eq!(event.status_code, 201);
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let event = Event::from_json(br#"{"id":"msg-2"}"#).unwrap();

        assert_eq!(event.status_code, 0);
        assert!(event.payload.is_empty());
        assert!(event.metadata.is_empty());
    }

    #[test]
    fn test_decode_rejects_empty_id() {
        let result = Event::from_json(br#"{"id":"  ","status_code":200}"#);
        assert!(matches!(result, Err(EventDecodeError::MissingId)));
    }

    #[test]
    fn test_decode_rejects_missing_id() {
        let result = Event::from_json(br#"{"status_code":200}"#);
        assert!(matches!(result, Err(EventDecodeError::Json(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Event::from_json(b"not json").is_err());
    }

    #[test]
    fn test_metadata_omitted_when_empty() {
        let value = serde_json::to_value(Event::new("a", 200)).unwrap();

        assert!(value.get("metadata").is_none());
        assert_eq!(value["status_code"], 200);
    }
}
