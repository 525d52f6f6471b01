//! Query requests and scored results.

use std::sync::Arc;

use serde::Serialize;

use super::incident::{CrisisType, IncidentId, IncidentRecord, Origin};
use super::Vector;
use crate::engine::fusion::ModalityWeights;

/// Optional caller-requested restriction of the candidate set.
///
/// Empty filter = every record is eligible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    /// Restrict to these crisis types. Empty = all types.
    pub crisis_types: Vec<CrisisType>,
    /// Restrict to one origin.
    pub origin: Option<Origin>,
}

impl QueryFilter {
    /// Whether this filter admits every record.
    pub fn is_empty(&self) -> bool {
        self.crisis_types.is_empty() && self.origin.is_none()
    }

    /// Whether a record passes the filter.
    pub fn matches(&self, record: &IncidentRecord) -> bool {
        if !self.crisis_types.is_empty() && !self.crisis_types.contains(&record.crisis_type) {
            return false;
        }
        match self.origin {
            Some(origin) => record.origin == origin,
            None => true,
        }
    }
}

/// A similarity query built from up to two modality vectors.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// Visual embedding.
    pub image: Option<Vector>,
    /// Textual embedding.
    pub text: Option<Vector>,
    /// Per-query modality weights; falls back to the service's configured weights.
    pub weights: Option<ModalityWeights>,
    /// Maximum number of results; falls back to the configured default.
    pub k: Option<usize>,
    /// Minimum raw similarity (inclusive); falls back to the configured default.
    pub min_score: Option<f32>,
    /// Candidate restriction.
    pub filter: QueryFilter,
}

impl QueryRequest {
    /// Query with both modalities.
    pub fn multimodal(image: Vector, text: Vector) -> Self {
        Self {
            image: Some(image),
            text: Some(text),
            ..Self::default()
        }
    }

    /// Image-only query.
    pub fn image(image: Vector) -> Self {
        Self {
            image: Some(image),
            ..Self::default()
        }
    }

    /// Text-only query.
    pub fn text(text: Vector) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }

    /// Return at most `k` results.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Drop matches whose raw similarity is below `min_score`.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Override the configured modality weights for this request.
    pub fn with_weights(mut self, weights: ModalityWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Restrict results to the given crisis types.
    pub fn with_crisis_types(mut self, types: Vec<CrisisType>) -> Self {
        self.filter.crisis_types = types;
        self
    }

    /// Restrict results to one origin.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.filter.origin = Some(origin);
        self
    }
}

/// A ranked match: the stored record plus its raw and decayed scores.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredResult {
    /// The record as stored in the index (shared, never copied).
    pub record: Arc<IncidentRecord>,
    /// Cosine similarity in [-1, 1].
    pub raw_score: f32,
    /// Age of the record at ranking time, never negative.
    pub age_hours: f64,
    /// Recency multiplier in (0, 1].
    pub decay_multiplier: f32,
    /// `raw_score` after recency decay; see `engine::decay::decay_score`.
    pub decayed_score: f32,
}

impl ScoredResult {
    /// A freshly scored hit, before any recency adjustment.
    pub fn new(record: Arc<IncidentRecord>, raw_score: f32) -> Self {
        Self {
            record,
            raw_score,
            age_hours: 0.0,
            decay_multiplier: 1.0,
            decayed_score: raw_score,
        }
    }

    /// Identifier of the matched record.
    pub fn id(&self) -> &IncidentId {
        &self.record.id
    }
}
