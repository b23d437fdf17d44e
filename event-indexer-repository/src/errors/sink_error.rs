//! Sink setup error types.

use thiserror::Error;

/// Errors that can occur while setting up or probing a sink.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// Invalid sink configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to create the target index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse a response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl SinkError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}
