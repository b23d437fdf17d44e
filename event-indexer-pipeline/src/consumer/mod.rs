//! Consumer module for the event indexer pipeline.
//!
//! Defines the [`EventSource`] port the orchestrator consumes from, and the
//! Kafka implementation of it.

mod kafka_consumer;
mod messages;
mod offsets;

pub use kafka_consumer::{KafkaConsumerConfig, KafkaEventSource};
pub use messages::{Acknowledge, Acknowledgement, SourceStreams, UnitOfWork};
pub use offsets::OffsetTracker;

use crate::shutdown::ShutdownSignal;

/// A live, at-least-once supply of units of work.
///
/// # Contract
///
/// - Both streams returned by [`consume`](EventSource::consume) close
///   promptly once `shutdown` fires.
/// - A unit that is never acknowledged is redelivered later.
/// - Acknowledging a unit never implicitly acknowledges earlier units that
///   are still in flight.
///
/// Implementations are shared across workers and must be `Send + Sync`.
pub trait EventSource: Send + Sync {
    /// Start consuming and return the unit stream and the error side channel.
    fn consume(&self, shutdown: ShutdownSignal) -> SourceStreams;
}
