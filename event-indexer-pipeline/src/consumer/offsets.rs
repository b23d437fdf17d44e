//! Per-partition offset tracking for out-of-order acknowledgment.
//!
//! Workers finish units in any order, but a Kafka commit position covers
//! every earlier offset of the partition. The tracker only hands out commit
//! positions that lie below the lowest still-pending offset.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct PartitionOffsets {
    pending: BTreeSet<i64>,
    /// One past the highest offset ever delivered.
    next: i64,
    /// Last position handed out for commit.
    committed: Option<i64>,
}

impl PartitionOffsets {
    fn commit_position(&self) -> i64 {
        self.pending.first().copied().unwrap_or(self.next)
    }
}

/// Tracks delivered-but-unacknowledged offsets for every partition.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    partitions: Mutex<HashMap<(String, i32), PartitionOffsets>>,
}

impl OffsetTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `offset` was delivered and is now in flight.
    pub fn track(&self, topic: &str, partition: i32, offset: i64) {
        let mut partitions = self.lock();
        let state = partitions
            .entry((topic.to_string(), partition))
            .or_default();

        state.pending.insert(offset);
        state.next = state.next.max(offset + 1);
    }

    /// Record that `offset` is done.
    ///
    /// Returns the position to commit when it moved past the last one
    /// handed out, or `None` when an earlier offset is still in flight.
    pub fn complete(&self, topic: &str, partition: i32, offset: i64) -> Option<i64> {
        let mut partitions = self.lock();
        let state = partitions.get_mut(&(topic.to_string(), partition))?;

        state.pending.remove(&offset);
        let position = state.commit_position();

        match state.committed {
            Some(committed) if position <= committed => None,
            _ => {
                state.committed = Some(position);
                Some(position)
            }
        }
    }

    /// Number of in-flight offsets for a partition.
    pub fn pending(&self, topic: &str, partition: i32) -> usize {
        self.lock()
            .get(&(topic.to_string(), partition))
            .map_or(0, |state| state.pending.len())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, i32), PartitionOffsets>> {
        match self.partitions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
