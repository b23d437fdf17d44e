//! Event sink trait definition.

use async_trait::async_trait;

use crate::errors::IndexError;
use event_indexer_shared::Event;

/// Abstract interface for durably indexing events.
///
/// Every write is keyed by the event's `id`. Writing the same id twice must
/// be harmless (last write wins), because the queue delivers at least once
/// and concurrent workers may race on the same id.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a single sink is shared by every
/// worker of the orchestrator.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Index a batch of events.
    ///
    /// # Arguments
    ///
    /// * `events` - Events to write, in order
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If every event was durably written
    /// * `Err(IndexError)` - If the batch could not be written. Conflicts are
    ///   resolved inside the sink and never returned here.
    async fn index(&self, events: &[Event]) -> Result<(), IndexError>;
}
