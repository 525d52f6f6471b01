//! Index by crisis type. Maps each CrisisType to sorted record positions.

use std::collections::{BTreeMap, HashMap};

use crate::types::{CrisisType, IncidentRecord};

/// Maps each CrisisType to a sorted list of record positions in the store.
pub struct TypeIndex {
    index: HashMap<CrisisType, Vec<usize>>,
}

impl TypeIndex {
    /// Create a new, empty type index.
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
        }
    }

    /// Get all positions of a given type.
    pub fn get(&self, crisis_type: CrisisType) -> &[usize] {
        self.index
            .get(&crisis_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get all positions matching any of the given types, merged and sorted.
    pub fn get_any(&self, crisis_types: &[CrisisType]) -> Vec<usize> {
        let mut result: Vec<usize> = Vec::new();
        for ct in crisis_types {
            if let Some(positions) = self.index.get(ct) {
                result.extend_from_slice(positions);
            }
        }
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Count records of a given type.
    pub fn count(&self, crisis_type: CrisisType) -> usize {
        self.index.get(&crisis_type).map(|v| v.len()).unwrap_or(0)
    }

    /// Per-type counts, omitting types with no records.
    pub fn counts(&self) -> BTreeMap<CrisisType, usize> {
        self.index
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(ct, v)| (*ct, v.len()))
            .collect()
    }

    /// Incrementally add a record stored at `position`.
    ///
    /// Positions are handed out in increasing order, so push keeps lists sorted.
    pub fn add(&mut self, record: &IncidentRecord, position: usize) {
        self.index
            .entry(record.crisis_type)
            .or_default()
            .push(position);
    }
}

impl Default for TypeIndex {
    fn default() -> Self {
        Self::new()
    }
}
