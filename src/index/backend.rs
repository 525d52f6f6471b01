//! The vector-index backend contract.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CrisisType, IncidentId, IncidentRecord, QueryFilter, RecallResult};

/// One scored record returned by a backend.
#[derive(Debug, Clone)]
pub struct Hit {
    pub record: Arc<IncidentRecord>,
    pub score: f32,
}

/// Whether a backend returns the exact top-k by cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    /// Exhaustive: identical to a linear scan.
    Exact,
    /// Candidate pruning may miss true neighbours. Scores of returned hits are still exact.
    Approximate,
}

/// Storage and nearest-neighbour search over incident records.
///
/// Implementations must be safe to share between threads: `insert` may run
/// while `query_top_k` is iterating, and a record must be visible either whole
/// or not at all. Once `insert` returns, later queries must see the record.
pub trait IndexBackend: Send + Sync {
    /// Backend name for logs and stats.
    fn name(&self) -> &'static str;

    /// Accuracy mode of `query_top_k`.
    fn accuracy(&self) -> Accuracy;

    /// Store a record. Fails with `DuplicateId` if the id is taken.
    fn insert(&self, record: Arc<IncidentRecord>) -> RecallResult<()>;

    /// Top `k` records with cosine score `>= min_score`, ordered by [`sort_hits`].
    fn query_top_k(
        &self,
        query: &[f32],
        k: usize,
        min_score: f32,
        filter: &QueryFilter,
    ) -> RecallResult<Vec<Hit>>;

    /// Look up a record by id.
    fn get(&self, id: &IncidentId) -> Option<Arc<IncidentRecord>>;

    /// Number of stored records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records in insertion order.
    fn records(&self) -> Vec<Arc<IncidentRecord>>;

    /// Record count per crisis type.
    fn count_by_type(&self) -> BTreeMap<CrisisType, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records() {
            *counts.entry(record.crisis_type).or_insert(0) += 1;
        }
        counts
    }

    /// The `n` most recently created records, newest first.
    fn most_recent(&self, n: usize) -> Vec<Arc<IncidentRecord>> {
        let mut records = self.records();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(n);
        records
    }

    /// Records created within `[start, end]`.
    fn created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Arc<IncidentRecord>> {
        self.records()
            .into_iter()
            .filter(|r| r.created_at >= start && r.created_at <= end)
            .collect()
    }
}

/// Canonical hit order: score descending, then `created_at` descending,
/// then id ascending so the order is total and independent of insertion order.
pub fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.record.created_at.cmp(&a.record.created_at))
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
}

// Stored records are immutable `Arc`s appended whole, so a panic in another
// holder cannot leave the guarded data half-written.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
