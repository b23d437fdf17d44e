//! OpenSearch index configuration and mappings.
//!
//! This module defines where events are written and the mappings of the
//! event index.

use serde_json::{json, Value};

use crate::errors::SinkError;

/// Connection and index settings for [`OpenSearchSink`](super::OpenSearchSink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// OpenSearch server URL (e.g. `http://localhost:9200`).
    pub url: String,
    /// Name of the index events are written to.
    pub index: String,
}

impl IndexConfig {
    /// Create a config, rejecting an empty url or index name.
    pub fn new(url: impl Into<String>, index: impl Into<String>) -> Result<Self, SinkError> {
        let url = url.into();
        let index = index.into();

        if url.trim().is_empty() {
            return Err(SinkError::config("OpenSearch url must not be empty"));
        }
        if index.trim().is_empty() {
            return Err(SinkError::config("index must not be empty"));
        }

        Ok(Self { url, index })
    }
}

/// Get the index settings and mappings for the event index.
///
/// `payload` stays a dynamic object since its contents are opaque to the
/// indexer. Metadata values are mapped as keywords for exact filtering.
pub fn get_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "dynamic_templates": [
                {
                    "metadata_as_keyword": {
                        "path_match": "metadata.*",
                        "mapping": { "type": "keyword" }
                    }
                }
            ],
            "properties": {
                "id": {
                    "type": "keyword"
                },
                "status_code": {
                    "type": "integer"
                },
                "payload": {
                    "type": "object",
                    "dynamic": true
                },
                "metadata": {
                    "type": "object"
                },
                "indexed_at": {
                    "type": "date"
                }
            }
        }
    })
}
