//! Status code classification and routing.
//!
//! Both functions are pure and total, so workers call them without any
//! shared state.

use std::fmt;

/// Coarse classification of an HTTP-like status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
    /// `0` (no code) or `200..=299`.
    Success,
    /// `400..=499`.
    ClientError,
    /// `500..=599`.
    ServerError,
    /// Anything else.
    Unknown,
}

impl StatusCategory {
    /// Stable lowercase name, used as a structured log field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the producer marked the event as a retriable failure.
    ///
    /// Informational only: [`route`] drops server errors like every other
    /// non-success category.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ServerError)
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the orchestrator does with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Write the event to the sink, acknowledge only on success.
    Index,
    /// Acknowledge without indexing.
    DropAcknowledged,
}

/// Classify a status code.
///
/// A zero status means the producer set none and is treated as success.
pub fn classify(status_code: i64) -> StatusCategory {
    match status_code {
        0 | 200..=299 => StatusCategory::Success,
        400..=499 => StatusCategory::ClientError,
        500..=599 => StatusCategory::ServerError,
        _ => StatusCategory::Unknown,
    }
}

/// Map a category to its routing decision. Only successes are indexed.
pub fn route(category: StatusCategory) -> RoutingDecision {
    match category {
        StatusCategory::Success => RoutingDecision::Index,
        StatusCategory::ClientError | StatusCategory::ServerError | StatusCategory::Unknown => {
            RoutingDecision::DropAcknowledged
        }
    }
}
