//! Append-only record storage shared by the bundled backends.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::backend::{sort_hits, Hit};
use super::{TemporalIndex, TypeIndex};
use crate::types::{
    CrisisType, IncidentId, IncidentRecord, QueryFilter, RecallError, RecallResult,
};
use crate::vector::cosine_with_norm;

/// Records in insertion order plus the lookup indexes over them.
///
/// Records are never removed, so a position is a stable handle.
pub struct RecordStore {
    records: Vec<Arc<IncidentRecord>>,
    positions: HashMap<IncidentId, usize>,
    type_index: TypeIndex,
    temporal_index: TemporalIndex,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            positions: HashMap::new(),
            type_index: TypeIndex::new(),
            temporal_index: TemporalIndex::new(),
        }
    }

    /// Append a record, returning its position.
    pub fn push(&mut self, record: Arc<IncidentRecord>) -> RecallResult<usize> {
        if self.positions.contains_key(&record.id) {
            return Err(RecallError::DuplicateId(record.id.clone()));
        }
        let position = self.records.len();
        self.type_index.add(&record, position);
        self.temporal_index.add(&record, position);
        self.positions.insert(record.id.clone(), position);
        self.records.push(record);
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &IncidentId) -> Option<&Arc<IncidentRecord>> {
        self.positions.get(id).map(|&pos| &self.records[pos])
    }

    pub fn at(&self, position: usize) -> Option<&Arc<IncidentRecord>> {
        self.records.get(position)
    }

    pub fn records(&self) -> &[Arc<IncidentRecord>] {
        &self.records
    }

    pub fn count_by_type(&self) -> BTreeMap<CrisisType, usize> {
        self.type_index.counts()
    }

    pub fn most_recent(&self, n: usize) -> Vec<Arc<IncidentRecord>> {
        self.temporal_index
            .most_recent(n)
            .into_iter()
            .map(|pos| Arc::clone(&self.records[pos]))
            .collect()
    }

    pub fn created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Arc<IncidentRecord>> {
        self.temporal_index
            .range(start, end)
            .into_iter()
            .map(|pos| Arc::clone(&self.records[pos]))
            .collect()
    }

    /// Positions eligible under `filter`, narrowed through the type index when possible.
    pub fn candidates(&self, filter: &QueryFilter) -> Vec<usize> {
        let base: Vec<usize> = if filter.crisis_types.is_empty() {
            (0..self.records.len()).collect()
        } else {
            self.type_index.get_any(&filter.crisis_types)
        };
        if filter.origin.is_none() {
            return base;
        }
        base.into_iter()
            .filter(|&pos| filter.matches(&self.records[pos]))
            .collect()
    }

    /// Exact cosine scoring of the given positions, ranked and cut to `k`.
    pub fn score_positions(
        &self,
        query: &[f32],
        query_norm: f64,
        positions: impl IntoIterator<Item = usize>,
        k: usize,
        min_score: f32,
    ) -> Vec<Hit> {
        let mut hits: Vec<Hit> = positions
            .into_iter()
            .filter_map(|pos| {
                let record = self.records.get(pos)?;
                let score = cosine_with_norm(query, query_norm, &record.vector)?;
                (score >= min_score).then(|| Hit {
                    record: Arc::clone(record),
                    score,
                })
            })
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        hits
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
