//! # Event Indexer Pipeline
//!
//! This crate provides the pipeline that relays status-tagged events from
//! Kafka into the search index.
//!
//! ## Architecture
//!
//! 1. **Consumer**: Yields units of work (event + acknowledgment) from Kafka
//! 2. **Processor**: Classifies each event's status code into a routing decision
//! 3. **Orchestrator**: Runs the worker pool that indexes and acknowledges
//! 4. **Shutdown**: Cooperative stop signal shared by the consumer and workers

pub mod consumer;
pub mod errors;
pub mod orchestrator;
pub mod processor;
pub mod shutdown;

pub use errors::{PipelineError, SourceError};
