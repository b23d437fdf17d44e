//! # Event Indexer
//!
//! Main library for the event indexer.
//!
//! This crate provides the configuration, wiring and health endpoint for
//! running the event indexer pipeline.

pub mod config;
pub mod health;
pub mod service;

pub use config::{Dependencies, IndexerConfig};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] event_indexer_pipeline::PipelineError),

    /// Sink error.
    #[error("Sink error: {0}")]
    SinkError(#[from] event_indexer_repository::SinkError),

    /// Health endpoint error.
    #[error("Health endpoint error: {0}")]
    HealthError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a health endpoint error.
    pub fn health(msg: impl Into<String>) -> Self {
        Self::HealthError(msg.into())
    }
}
