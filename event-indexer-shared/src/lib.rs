//! # Event Indexer Shared
//!
//! Types shared by every crate of the event indexer: the [`Event`] consumed
//! from the queue and the [`EventDocument`] written to the search index.

mod document;
mod event;

pub use document::EventDocument;
pub use event::{Event, EventDecodeError};
