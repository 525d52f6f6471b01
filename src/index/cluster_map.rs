//! Cluster map: k-means partition of record vectors, and the approximate
//! backend that probes it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backend::{read_lock, write_lock, Accuracy, Hit, IndexBackend};
use super::store::RecordStore;
use crate::types::{CrisisType, IncidentId, IncidentRecord, QueryFilter, RecallResult};
use crate::vector::{cosine_with_norm, l2_norm};

/// k-means clustering of record vectors, keyed by store position.
pub struct ClusterMap {
    /// Cluster centroids.
    centroids: Vec<Vec<f32>>,
    /// cluster_index -> sorted positions of records in that cluster.
    assignments: Vec<Vec<usize>>,
    /// Vector dimension.
    dimension: usize,
    /// Record count at the last full build.
    built_at: usize,
}

impl ClusterMap {
    /// Create a new, empty cluster map.
    pub fn new(dimension: usize) -> Self {
        Self {
            centroids: Vec::new(),
            assignments: Vec::new(),
            dimension,
            built_at: 0,
        }
    }

    /// Run k-means over all vectors. k = min(ceil(sqrt(n)), 256). Skips if n < 4.
    pub fn build(&mut self, vectors: &[(usize, &[f32])], max_iterations: usize) {
        self.built_at = vectors.len();
        if vectors.len() < 4 {
            self.clear();
            return;
        }

        let k = ((vectors.len() as f64).sqrt().ceil() as usize).min(256);

        // Initialize centroids: pick k evenly-spaced records
        let step = vectors.len() / k;
        self.centroids = (0..k)
            .map(|i| {
                let idx = (i * step).min(vectors.len() - 1);
                vectors[idx].1.to_vec()
            })
            .collect();
        self.assignments = vec![Vec::new(); k];

        for _ in 0..max_iterations.max(1) {
            let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
            for (i, &(_, vec)) in vectors.iter().enumerate() {
                members[self.find_nearest_centroid(vec)].push(i);
            }

            let mut changed = false;
            for (ci, member_idxs) in members.iter().enumerate() {
                if member_idxs.is_empty() {
                    continue;
                }
                let mut new_centroid = vec![0.0f32; self.dimension];
                let count = member_idxs.len() as f32;
                for &i in member_idxs {
                    for (j, &val) in vectors[i].1.iter().enumerate() {
                        new_centroid[j] += val;
                    }
                }
                for val in &mut new_centroid {
                    *val /= count;
                }
                if new_centroid != self.centroids[ci] {
                    changed = true;
                    self.centroids[ci] = new_centroid;
                }
            }

            self.assignments = members
                .into_iter()
                .map(|idxs| idxs.into_iter().map(|i| vectors[i].0).collect())
                .collect();

            if !changed {
                break;
            }
        }

        for a in &mut self.assignments {
            a.sort_unstable();
        }
    }

    fn find_nearest_centroid(&self, vec: &[f32]) -> usize {
        let norm = l2_norm(vec);
        let mut best = 0;
        let mut best_sim = f32::NEG_INFINITY;
        for (i, centroid) in self.centroids.iter().enumerate() {
            let sim = cosine_with_norm(vec, norm, centroid).unwrap_or(f32::NEG_INFINITY);
            if sim > best_sim {
                best_sim = sim;
                best = i;
            }
        }
        best
    }

    /// The `n` clusters whose centroids are most similar to `query`, best first.
    pub fn nearest_clusters(&self, query: &[f32], n: usize) -> Vec<usize> {
        let norm = l2_norm(query);
        let mut ranked: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| {
                (
                    i,
                    cosine_with_norm(query, norm, c).unwrap_or(f32::NEG_INFINITY),
                )
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.into_iter().take(n).map(|(i, _)| i).collect()
    }

    /// Get all positions in a specific cluster.
    pub fn get_cluster(&self, cluster_index: usize) -> &[usize] {
        self.assignments
            .get(cluster_index)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Assign a new record to the nearest cluster without rebuilding.
    pub fn assign(&mut self, position: usize, vec: &[f32]) {
        if self.centroids.is_empty() {
            return;
        }
        let nearest = self.find_nearest_centroid(vec);
        let list = &mut self.assignments[nearest];
        let pos = list.binary_search(&position).unwrap_or_else(|p| p);
        list.insert(pos, position);
    }

    /// Number of clusters.
    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    /// Record count at the last full build.
    pub fn built_at(&self) -> usize {
        self.built_at
    }

    /// Clear the cluster map.
    pub fn clear(&mut self) {
        self.centroids.clear();
        self.assignments.clear();
    }

    /// Whether the cluster map is empty.
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

/// Tuning for [`ClusteredBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Number of nearest clusters scanned per query.
    pub n_probe: usize,
    /// Below this many records the backend scans exhaustively.
    pub min_records: usize,
    /// k-means iteration cap per rebuild.
    pub max_iterations: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_probe: 4,
            min_records: 64,
            max_iterations: 10,
        }
    }
}

struct ClusteredState {
    store: RecordStore,
    clusters: ClusterMap,
}

/// Approximate backend: scores only records in the clusters nearest the query.
///
/// Returned scores are exact cosine similarities, but a true neighbour that
/// sits in an unprobed cluster can be missed. The map is rebuilt whenever the
/// record count doubles; in between, new records join their nearest cluster.
pub struct ClusteredBackend {
    state: RwLock<ClusteredState>,
    params: ClusterParams,
}

impl ClusteredBackend {
    pub fn new(dimension: usize, params: ClusterParams) -> Self {
        Self {
            state: RwLock::new(ClusteredState {
                store: RecordStore::new(),
                clusters: ClusterMap::new(dimension),
            }),
            params,
        }
    }

    pub fn params(&self) -> ClusterParams {
        self.params
    }

    /// Current number of clusters (0 while below `min_records`).
    pub fn cluster_count(&self) -> usize {
        read_lock(&self.state).clusters.cluster_count()
    }
}

impl IndexBackend for ClusteredBackend {
    fn name(&self) -> &'static str {
        "clustered"
    }

    fn accuracy(&self) -> Accuracy {
        Accuracy::Approximate
    }

    fn insert(&self, record: Arc<IncidentRecord>) -> RecallResult<()> {
        let mut state = write_lock(&self.state);
        let position = state.store.push(Arc::clone(&record))?;
        let count = state.store.len();

        let needs_rebuild = count >= self.params.min_records
            && (state.clusters.is_empty() || count >= state.clusters.built_at() * 2);

        if needs_rebuild {
            let ClusteredState { store, clusters } = &mut *state;
            let vectors: Vec<(usize, &[f32])> = store
                .records()
                .iter()
                .enumerate()
                .map(|(pos, r)| (pos, r.vector.as_slice()))
                .collect();
            clusters.build(&vectors, self.params.max_iterations);
            log::debug!(
                "Rebuilt cluster map: {} clusters over {} records",
                clusters.cluster_count(),
                count
            );
        } else {
            state.clusters.assign(position, &record.vector);
        }
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
        let state = read_lock(&self.state);

        if state.clusters.is_empty() {
            let candidates = state.store.candidates(filter);
            return Ok(state
                .store
                .score_positions(query, query_norm, candidates, k, min_score));
        }

        let mut positions: Vec<usize> = state
            .clusters
            .nearest_clusters(query, self.params.n_probe.max(1))
            .into_iter()
            .flat_map(|ci| state.clusters.get_cluster(ci).iter().copied())
            .collect();
        positions.sort_unstable();
        positions.dedup();
        if !filter.is_empty() {
            positions.retain(|&pos| {
                state
                    .store
                    .at(pos)
                    .map(|r| filter.matches(r))
                    .unwrap_or(false)
            });
        }
        Ok(state
            .store
            .score_positions(query, query_norm, positions, k, min_score))
    }

    fn get(&self, id: &IncidentId) -> Option<Arc<IncidentRecord>> {
        read_lock(&self.state).store.get(id).cloned()
    }

    fn len(&self) -> usize {
        read_lock(&self.state).store.len()
    }

    fn records(&self) -> Vec<Arc<IncidentRecord>> {
        read_lock(&self.state).store.records().to_vec()
    }

    fn count_by_type(&self) -> BTreeMap<CrisisType, usize> {
        read_lock(&self.state).store.count_by_type()
    }

    fn most_recent(&self, n: usize) -> Vec<Arc<IncidentRecord>> {
        read_lock(&self.state).store.most_recent(n)
    }

    fn created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Arc<IncidentRecord>> {
        read_lock(&self.state).store.created_between(start, end)
    }
}
