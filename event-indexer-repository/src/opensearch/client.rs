//! OpenSearch sink implementation.
//!
//! This module provides the concrete implementation of `EventSink` using the
//! OpenSearch Rust client and its bulk API.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    params::Refresh,
    BulkOperation, BulkParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::{IndexError, SinkError};
use crate::interfaces::EventSink;
use crate::opensearch::bulk::{check_items, check_response_status};
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use event_indexer_shared::{Event, EventDocument};

/// OpenSearch-backed event sink.
///
/// Each event becomes one bulk `index` action whose document id is the
/// event id, so redelivered events overwrite their earlier copy.
///
/// # Example
///
/// ```ignore
/// let config = IndexConfig::new("http://localhost:9200", "messages")?;
/// let sink = OpenSearchSink::new(config)?;
/// sink.ensure_index_exists().await?;
/// sink.index(&[Event::new("msg-1", 200)]).await?;
/// ```
pub struct OpenSearchSink {
    client: OpenSearch,
    config: IndexConfig,
}

impl OpenSearchSink {
    /// Create a new sink connected to the configured URL.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchSink)` - A new sink instance
    /// * `Err(SinkError)` - If the URL is invalid or transport setup fails
    pub fn new(config: IndexConfig) -> Result<Self, SinkError> {
        let parsed_url = Url::parse(&config.url).map_err(|e| SinkError::config(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SinkError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %config.url, index = %config.index, "Created OpenSearch sink");

        Ok(Self { client, config })
    }

    /// Name of the index events are written to.
    pub fn index_name(&self) -> &str {
        &self.config.index
    }

    /// Create the event index with its mappings if it does not exist yet.
    pub async fn ensure_index_exists(&self) -> Result<(), SinkError> {
        let index = self.config.index.as_str();

        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SinkError::connection(e.to_string()))?;

        if exists.status_code().is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings())
            .send()
            .await
            .map_err(|e| SinkError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Another replica may have created it between the two calls.
            if body.contains("resource_already_exists_exception") {
                return Ok(());
            }
            error!(status = %status, body = %body, "Index creation failed");
            return Err(SinkError::index_creation(format!(
                "create index {} returned {}: {}",
                index, status, body
            )));
        }

        info!(index = %index, "Created event index");
        Ok(())
    }

    /// Check whether the cluster is reachable and green or yellow.
    pub async fn health_check(&self) -> Result<bool, SinkError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SinkError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SinkError::parse(e.to_string()))?;

        let status = body.get("status").and_then(Value::as_str).unwrap_or("red");
        Ok(matches!(status, "green" | "yellow"))
    }
}

#[async_trait]
impl EventSink for OpenSearchSink {
    #[instrument(skip(self, events), fields(event_count = events.len(), index = %self.config.index))]
    async fn index(&self, events: &[Event]) -> Result<(), IndexError> {
        if events.is_empty() {
            return Ok(());
        }

        let operations: Vec<BulkOperation<EventDocument>> = events
            .iter()
            .map(|event| {
                BulkOperation::index(EventDocument::from_event(event))
                    .id(event.id.as_str())
                    .into()
            })
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(&self.config.index))
            .body(operations)
            .refresh(Refresh::WaitFor)
            .send()
            .await
            .map_err(|e| IndexError::unavailable(format!("bulk request failed: {}", e)))?;

        match check_response_status(response.status_code().as_u16()) {
            Ok(()) => {}
            Err(IndexError::Conflict(reason)) => {
                debug!(reason = %reason, "Bulk request conflicted with existing documents");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IndexError::rejected(format!("decode bulk response: {}", e)))?;

        check_items(&body)?;

        debug!("Indexed events");
        Ok(())
    }
}
