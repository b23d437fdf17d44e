//! Environment-driven settings for the event indexer.

use std::env;
use std::net::SocketAddr;

use crate::IndexingError;

/// Default Kafka topic.
const DEFAULT_KAFKA_TOPIC: &str = "messages";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "indexer-group";

/// Default OpenSearch index.
const DEFAULT_OPENSEARCH_INDEX: &str = "messages";

const DEFAULT_WORKER_COUNT: usize = 5;

const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8080";

/// Runtime settings for the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Kafka broker addresses.
    pub kafka_brokers: Vec<String>,
    /// Topic to consume.
    pub kafka_topic: String,
    /// Consumer group ID.
    pub kafka_group_id: String,
    /// OpenSearch server URL.
    pub opensearch_url: String,
    /// Index events are written to.
    pub opensearch_index: String,
    /// Number of concurrent workers, at least 1.
    pub worker_count: usize,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Address the health endpoint listens on.
    pub health_addr: SocketAddr,
}

impl IndexerConfig {
    /// Load settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_BROKERS`: Comma-separated broker list (required)
    /// - `KAFKA_TOPIC`: Topic to consume (default: messages)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: indexer-group)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (required)
    /// - `OPENSEARCH_INDEX`: Target index (default: messages)
    /// - `WORKER_COUNT`: Worker pool size (default: 5, values below 1 become 1)
    /// - `LOG_LEVEL`: Log filter (default: info)
    /// - `HEALTH_ADDR`: Health endpoint address (default: 0.0.0.0:8080)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| IndexingError::config(format!("{} must be set", key)))
        };

        let kafka_brokers: Vec<String> = required("KAFKA_BROKERS")?
            .split(',')
            .map(str::trim)
            .filter(|broker| !broker.is_empty())
            .map(String::from)
            .collect();
        if kafka_brokers.is_empty() {
            return Err(IndexingError::config("KAFKA_BROKERS has no broker addresses"));
        }

        let worker_count = match get("WORKER_COUNT") {
            None => DEFAULT_WORKER_COUNT,
            Some(raw) => parse_worker_count(&raw)?,
        };

        let health_addr = get("HEALTH_ADDR")
            .unwrap_or_else(|| DEFAULT_HEALTH_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| IndexingError::config(format!("HEALTH_ADDR is invalid: {}", e)))?;

        Ok(Self {
            kafka_brokers,
            kafka_topic: get("KAFKA_TOPIC").unwrap_or_else(|| DEFAULT_KAFKA_TOPIC.to_string()),
            kafka_group_id: get("KAFKA_GROUP_ID")
                .unwrap_or_else(|| DEFAULT_KAFKA_GROUP_ID.to_string()),
            opensearch_url: required("OPENSEARCH_URL")?,
            opensearch_index: get("OPENSEARCH_INDEX")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_INDEX.to_string()),
            worker_count,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            health_addr,
        })
    }
}

fn parse_worker_count(raw: &str) -> Result<usize, IndexingError> {
    let count: i64 = raw
        .parse()
        .map_err(|e| IndexingError::config(format!("WORKER_COUNT is not an integer: {}", e)))?;

    Ok(usize::try_from(count).unwrap_or(0).max(1))
}
