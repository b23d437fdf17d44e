//! Processor module for the event indexer pipeline.
//!
//! Decides, from an event's status code alone, whether the event is indexed
//! or dropped.

mod status_classifier;

pub use status_classifier::{classify, route, RoutingDecision, StatusCategory};
