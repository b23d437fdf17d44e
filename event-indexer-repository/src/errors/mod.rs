//! Error types for the event indexer repository.

mod index_error;
mod sink_error;

pub use index_error::IndexError;
pub use sink_error::SinkError;
