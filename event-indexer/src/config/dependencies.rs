//! Dependency initialization and wiring for the event indexer.

use std::sync::Arc;
use tracing::info;

use crate::{IndexerConfig, IndexingError};
use event_indexer_pipeline::{
    consumer::{KafkaConsumerConfig, KafkaEventSource},
    orchestrator::Orchestrator,
};
use event_indexer_repository::{IndexConfig, OpenSearchSink};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from the loaded configuration.
    ///
    /// Verifies OpenSearch is reachable and the target index exists before
    /// subscribing to Kafka, so a misconfigured deployment fails before any
    /// worker starts.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new(config: &IndexerConfig) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %config.opensearch_url,
            opensearch_index = %config.opensearch_index,
            kafka_brokers = %config.kafka_brokers.join(","),
            kafka_topic = %config.kafka_topic,
            kafka_group_id = %config.kafka_group_id,
            worker_count = config.worker_count,
            "Initializing dependencies"
        );

        // Initialize OpenSearch sink
        let index_config = IndexConfig::new(&config.opensearch_url, &config.opensearch_index)?;
        let sink = OpenSearchSink::new(index_config)?;

        // Verify OpenSearch is reachable
        let healthy = sink.health_check().await.map_err(|e| {
            IndexingError::config(format!("OpenSearch health check failed: {}", e))
        })?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        sink.ensure_index_exists().await?;

        // Initialize Kafka source
        let source = KafkaEventSource::new(KafkaConsumerConfig::new(
            config.kafka_brokers.clone(),
            &config.kafka_topic,
            &config.kafka_group_id,
        ))?;
        source.subscribe()?;

        info!("Kafka consumer created");

        let orchestrator =
            Orchestrator::new(Arc::new(source), Arc::new(sink), config.worker_count);

        Ok(Self { orchestrator })
    }
}
