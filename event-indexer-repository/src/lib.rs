//! # Event Indexer Repository
//!
//! This crate provides the sink interface the pipeline indexes events
//! through, the error taxonomy of that interface, and a concrete
//! implementation backed by OpenSearch.

pub mod errors;
pub mod interfaces;
pub mod opensearch;

pub use errors::{IndexError, SinkError};
pub use interfaces::EventSink;
pub use opensearch::{IndexConfig, OpenSearchSink};
