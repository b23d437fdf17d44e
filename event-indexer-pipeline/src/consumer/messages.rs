//! Message types for the consumer.
//!
//! Defines the units of work that flow from a source to the workers.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::SourceError;
use event_indexer_shared::Event;

/// Source-specific way of marking one delivered event as processed.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    /// Durably mark the event as processed so it is not redelivered.
    async fn acknowledge(&self) -> Result<(), SourceError>;
}

/// Single-use acknowledgment capability for one unit of work.
///
/// [`acknowledge`](Acknowledgement::acknowledge) consumes the capability, so
/// a unit can be acknowledged at most once. Dropping it abandons the unit,
/// leaving it for redelivery.
pub struct Acknowledgement {
    inner: Box<dyn Acknowledge>,
}

impl Acknowledgement {
    /// Wrap a source-specific acknowledger.
    pub fn new(inner: impl Acknowledge + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Acknowledge the unit.
    pub async fn acknowledge(self) -> Result<(), SourceError> {
        self.inner.acknowledge().await
    }
}

impl std::fmt::Debug for Acknowledgement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acknowledgement").finish_non_exhaustive()
    }
}

/// One event paired with its acknowledgment capability.
#[derive(Debug)]
pub struct UnitOfWork {
    event: Event,
    ack: Acknowledgement,
}

impl UnitOfWork {
    /// Create a unit of work.
    pub fn new(event: Event, ack: Acknowledgement) -> Self {
        Self { event, ack }
    }

    /// The delivered event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Split the unit into its event and acknowledgment capability.
    pub fn into_parts(self) -> (Event, Acknowledgement) {
        (self.event, self.ack)
    }
}

/// The two channels a source hands to the orchestrator.
#[derive(Debug)]
pub struct SourceStreams {
    /// Delivered units of work.
    pub units: mpsc::Receiver<UnitOfWork>,
    /// Errors from the source. Non-fatal to the orchestrator.
    pub errors: mpsc::Receiver<SourceError>,
}

impl SourceStreams {
    /// Streams that are already closed.
    pub fn closed() -> Self {
        let (_, units) = mpsc::channel(1);
        let (_, errors) = mpsc::channel(1);
        Self { units, errors }
    }
}
