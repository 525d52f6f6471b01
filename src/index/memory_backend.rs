//! In-memory reference backend: exact linear scan.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::backend::{read_lock, write_lock, Accuracy, Hit, IndexBackend};
use super::store::RecordStore;
use crate::types::{CrisisType, IncidentId, IncidentRecord, QueryFilter, RecallResult};
use crate::vector::l2_norm;

/// Exhaustive cosine search over every eligible record.
pub struct MemoryBackend {
    store: RwLock<RecordStore>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(RecordStore::new()),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn accuracy(&self) -> Accuracy {
        Accuracy::Exact
    }

    fn insert(&self, record: Arc<IncidentRecord>) -> RecallResult<()> {
        write_lock(&self.store).push(record)?;
        Ok(())
    }

    fn query_top_k(
        &self,
        query: &[f32],
        k: usize,
        min_score: f32,
        filter: &QueryFilter,
    ) -> RecallResult<Vec<Hit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_norm = l2_norm(query);
        let store = read_lock(&self.store);
        let candidates = store.candidates(filter);
        Ok(store.score_positions(query, query_norm, candidates, k, min_score))
    }

    fn get(&self, id: &IncidentId) -> Option<Arc<IncidentRecord>> {
        read_lock(&self.store).get(id).cloned()
    }

    fn len(&self) -> usize {
        read_lock(&self.store).len()
    }

    fn records(&self) -> Vec<Arc<IncidentRecord>> {
        read_lock(&self.store).records().to_vec()
    }

    fn count_by_type(&self) -> BTreeMap<CrisisType, usize> {
        read_lock(&self.store).count_by_type()
    }

    fn most_recent(&self, n: usize) -> Vec<Arc<IncidentRecord>> {
        read_lock(&self.store).most_recent(n)
    }

    fn created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Arc<IncidentRecord>> {
        read_lock(&self.store).created_between(start, end)
    }
}
