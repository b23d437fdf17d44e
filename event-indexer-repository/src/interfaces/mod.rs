//! Interface definitions for the indexing sink.
//!
//! The pipeline depends only on the [`EventSink`] trait, so the backing
//! store can be swapped or mocked.

mod event_sink;

pub use event_sink::EventSink;
