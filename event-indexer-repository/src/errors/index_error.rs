//! Index error types.
//!
//! This module defines the failures a sink may report from an `index` call.

use thiserror::Error;

/// Errors that can occur while indexing a batch of events.
///
/// Any of these leaves the batch's units unacknowledged, so the queue
/// redelivers them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// A write collided with an identically-keyed document.
    ///
    /// Sinks resolve this internally; it never reaches callers of `index`.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backing store is rate limiting requests.
    #[error("Throttled: {0}")]
    Throttled(String),

    /// The backing store reported a server-side fault or could not be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Any other failure, including malformed requests and permanent rejections.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl IndexError {
    /// Create a conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a throttled error.
    pub fn throttled(msg: impl Into<String>) -> Self {
        Self::Throttled(msg.into())
    }

    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a rejected error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Short name of the error kind, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Conflict(_) => "conflict",
            Self::Throttled(_) => "throttled",
            Self::Unavailable(_) => "unavailable",
            Self::Rejected(_) => "rejected",
        }
    }

    /// Whether retrying the same write later may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Unavailable(_))
    }
}
