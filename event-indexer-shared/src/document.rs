//! The document body stored in the search index for an event.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Event;

/// Indexed form of an [`Event`].
///
/// Keyed by the event id in the index, so re-indexing the same event
/// overwrites the previous document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDocument {
    pub id: String,
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub status_code: i64,
    /// When this document was written.
    pub indexed_at: DateTime<Utc>,
}

impl EventDocument {
    /// Build a document from an event, stamped with the current time.
    pub fn from_event(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            payload: event.payload.clone(),
            metadata: event.metadata.clone(),
            status_code: event.status_code,
            indexed_at: Utc::now(),
        }
    }
}

impl From<&Event> for EventDocument {
    fn from(event: &Event) -> Self {
        Self::from_event(event)
    }
}
