//! SimilarityIndex: the authoritative record set and its top-k contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::backend::{sort_hits, Accuracy, IndexBackend};
use super::cluster_map::ClusteredBackend;
use super::memory_backend::MemoryBackend;
use crate::config::BackendConfig;
use crate::types::{
    CrisisType, IncidentId, IncidentRecord, QueryFilter, RecallError, RecallResult, ScoredResult,
};
use crate::vector::{is_zero, l2_norm};

/// Contract wrapper around a configured [`IndexBackend`].
///
/// Validates vector lengths on both the write and read paths and enforces the
/// canonical result order whatever the backend returns.
pub struct SimilarityIndex {
    backend: Box<dyn IndexBackend>,
    dimension: usize,
}

impl SimilarityIndex {
    /// An exact in-memory index.
    pub fn new(dimension: usize) -> Self {
        Self::with_backend(dimension, Box::new(MemoryBackend::new()))
    }

    /// Wrap an arbitrary backend.
    pub fn with_backend(dimension: usize, backend: Box<dyn IndexBackend>) -> Self {
        if backend.accuracy() == Accuracy::Approximate {
            log::warn!(
                "Similarity index using approximate backend '{}': top-k may omit true neighbours",
                backend.name()
            );
        }
        Self { backend, dimension }
    }

    /// Build the backend described by configuration.
    pub fn from_config(dimension: usize, config: &BackendConfig) -> Self {
        let backend: Box<dyn IndexBackend> = match config {
            BackendConfig::Memory => Box::new(MemoryBackend::new()),
            BackendConfig::Clustered(params) => Box::new(ClusteredBackend::new(dimension, *params)),
        };
        Self::with_backend(dimension, backend)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn accuracy(&self) -> Accuracy {
        self.backend.accuracy()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Insert a new record.
    ///
    /// Fails with `DimensionMismatch` / `DegenerateVector` on a bad vector and
    /// with `DuplicateId` if the id is already stored; the index is unchanged
    /// on failure. The record is visible to every query issued after return.
    pub fn insert(&self, record: IncidentRecord) -> RecallResult<Arc<IncidentRecord>> {
        record.validate(self.dimension)?;
        let record = Arc::new(record);
        self.backend.insert(Arc::clone(&record))?;
        log::debug!(
            "Indexed incident {} ({}, {})",
            record.id,
            record.crisis_type,
            record.origin
        );
        Ok(record)
    }

    /// Top `k` records by cosine similarity with score `>= min_score`.
    ///
    /// Ties break by `created_at` descending, then id ascending.
    /// An empty index yields an empty result.
    pub fn query(
        &self,
        vector: &[f32],
        k: usize,
        min_score: f32,
        filter: &QueryFilter,
    ) -> RecallResult<Vec<ScoredResult>> {
        if vector.len() != self.dimension {
            return Err(RecallError::DimensionMismatch {
                context: "index query vector",
                expected: self.dimension,
                got: vector.len(),
            });
        }
        if is_zero(vector) || !l2_norm(vector).is_finite() {
            return Err(RecallError::DegenerateVector {
                context: "index query vector",
            });
        }
        if k == 0 || self.backend.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = self.backend.query_top_k(vector, k, min_score, filter)?;
        hits.retain(|h| h.score >= min_score && filter.matches(&h.record));
        sort_hits(&mut hits);
        hits.truncate(k);

        Ok(hits
            .into_iter()
            .map(|h| ScoredResult::new(h.record, h.score))
            .collect())
    }

    /// Look up a record by id.
    pub fn get(&self, id: &IncidentId) -> Option<Arc<IncidentRecord>> {
        self.backend.get(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    /// All records in insertion order.
    pub fn records(&self) -> Vec<Arc<IncidentRecord>> {
        self.backend.records()
    }

    pub fn count_by_type(&self) -> BTreeMap<CrisisType, usize> {
        self.backend.count_by_type()
    }

    /// The `n` most recently created records, newest first.
    pub fn most_recent(&self, n: usize) -> Vec<Arc<IncidentRecord>> {
        self.backend.most_recent(n)
    }

    /// Records created within `[start, end]`.
    pub fn created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Arc<IncidentRecord>> {
        self.backend.created_between(start, end)
    }
}
