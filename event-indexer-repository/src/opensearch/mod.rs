//! OpenSearch implementation of the event sink.

mod bulk;
mod client;
mod index_config;

pub use client::OpenSearchSink;
pub use index_config::IndexConfig;
