//! Temporal index of sorted (created_at, position) pairs for recency lookups.

use chrono::{DateTime, Utc};

use crate::types::IncidentRecord;

/// Sorted list of (created_at, position) pairs.
pub struct TemporalIndex {
    /// Sorted by timestamp ascending, then position.
    entries: Vec<(DateTime<Utc>, usize)>,
}

impl TemporalIndex {
    /// Create a new, empty temporal index.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Positions of records created within a time range (inclusive).
    pub fn range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<usize> {
        let lo = self.entries.partition_point(|(ts, _)| *ts < start);
        let hi = self.entries.partition_point(|(ts, _)| *ts <= end);
        if lo >= hi {
            return Vec::new();
        }
        self.entries[lo..hi].iter().map(|(_, pos)| *pos).collect()
    }

    /// Positions of the most recent N records, newest first.
    pub fn most_recent(&self, n: usize) -> Vec<usize> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..]
            .iter()
            .rev()
            .map(|(_, pos)| *pos)
            .collect()
    }

    /// Incrementally add a record stored at `position`.
    pub fn add(&mut self, record: &IncidentRecord, position: usize) {
        let entry = (record.created_at, position);
        let pos = self.entries.partition_point(|e| *e < entry);
        self.entries.insert(pos, entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TemporalIndex {
    fn default() -> Self {
        Self::new()
    }
}
