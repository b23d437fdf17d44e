//! Error types for the event indexer pipeline.

use thiserror::Error;

/// Errors reported by an event source, either on its error channel or from
/// an acknowledgment.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Kafka client error while consuming.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// A record could not be decoded into an event.
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Committing an acknowledged offset failed.
    #[error("Acknowledge error: {0}")]
    AcknowledgeError(String),
}

impl SourceError {
    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Create an acknowledge error.
    pub fn acknowledge(msg: impl Into<String>) -> Self {
        Self::AcknowledgeError(msg.into())
    }
}

/// Errors that can occur while building or running the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Kafka client setup error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// `run` was called on an orchestrator that already ran.
    #[error("Orchestrator already started")]
    AlreadyStarted,
}

impl PipelineError {
    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for PipelineError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}
