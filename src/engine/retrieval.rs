//! The retrieval service: fuse, search and decay, plus the incident write path.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::decay::DecayRanker;
use super::explain::Explanation;
use super::fusion::FusionEngine;
use super::protocol::{Protocol, ProtocolBook};
use super::seed::SeedRecord;
use crate::config::{RecallConfig, SearchConfig};
use crate::embedding::EmbeddingProvider;
use crate::index::{Accuracy, IndexBackend, SimilarityIndex};
use crate::types::{
    CrisisType, IncidentId, IncidentRecord, IncidentRecordBuilder, Metadata, Origin, QueryRequest,
    RecallResult, ScoredResult,
};

/// Descriptive fields for a runtime-submitted incident.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub crisis_type: CrisisType,
    pub metadata: Metadata,
}

impl NewIncident {
    pub fn new(crisis_type: CrisisType) -> Self {
        Self {
            crisis_type,
            metadata: Metadata::new(),
        }
    }

    /// Add a single metadata attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Point-in-time summary of the index.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub total: usize,
    pub seed: usize,
    pub submitted: usize,
    /// Records created in the 24 hours before the snapshot time.
    pub last_24h: usize,
    /// Newest records first.
    pub recent: Vec<Arc<IncidentRecord>>,
    pub backend: &'static str,
    pub accuracy: Accuracy,
    pub taken_at: DateTime<Utc>,
}

/// Number of records listed in [`Snapshot::recent`].
const SNAPSHOT_RECENT: usize = 5;

/// Public entry point: similarity search and incident recording.
///
/// Holds no record data of its own; every read goes through the index.
pub struct RetrievalService {
    fusion: FusionEngine,
    index: SimilarityIndex,
    ranker: DecayRanker,
    search: SearchConfig,
    protocols: ProtocolBook,
}

impl RetrievalService {
    /// Build a service with the backend named in `config`.
    pub fn new(config: RecallConfig) -> RecallResult<Self> {
        config.validate()?;
        let index = SimilarityIndex::from_config(config.dimension, &config.backend);
        Self::assemble(config, index)
    }

    /// Build a service around a caller-supplied backend.
    pub fn with_backend(config: RecallConfig, backend: Box<dyn IndexBackend>) -> RecallResult<Self> {
        config.validate()?;
        let index = SimilarityIndex::with_backend(config.dimension, backend);
        Self::assemble(config, index)
    }

    fn assemble(config: RecallConfig, index: SimilarityIndex) -> RecallResult<Self> {
        let fusion = FusionEngine::with_weights(config.dimension, config.fusion)?;
        log::debug!(
            "Retrieval service ready: dimension={}, backend={}, weights={:?}",
            config.dimension,
            index.backend_name(),
            config.fusion
        );
        Ok(Self {
            fusion,
            index,
            ranker: DecayRanker::new(config.decay),
            search: config.search,
            protocols: config.protocols,
        })
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    pub fn dimension(&self) -> usize {
        self.fusion.dimension()
    }

    /// Find similar incidents, ranked as of now.
    pub fn find_similar(&self, request: &QueryRequest) -> RecallResult<Vec<ScoredResult>> {
        self.find_similar_at(request, Utc::now())
    }

    /// Find similar incidents, ranked as of `now`.
    ///
    /// fuse -> index query -> recency rerank.
    pub fn find_similar_at(
        &self,
        request: &QueryRequest,
        now: DateTime<Utc>,
    ) -> RecallResult<Vec<ScoredResult>> {
        let weights = request.weights.unwrap_or_else(|| self.fusion.weights());
        let fused = self
            .fusion
            .fuse(request.image.as_deref(), request.text.as_deref(), weights)?;

        let k = request.k.unwrap_or(self.search.default_k);
        let min_score = request.min_score.unwrap_or(self.search.min_score);
        let hits = self.index.query(&fused, k, min_score, &request.filter)?;
        let ranked = self.ranker.rerank(hits, now);

        log::debug!(
            "find_similar: k={}, min_score={}, results={}, top={:?}",
            k,
            min_score,
            ranked.len(),
            ranked.first().map(|r| r.id().as_str())
        );
        Ok(ranked)
    }

    /// Record a new incident as of now. Returns its fresh id.
    pub fn record_incident(
        &self,
        image: Option<&[f32]>,
        text: Option<&[f32]>,
        incident: NewIncident,
    ) -> RecallResult<IncidentId> {
        self.record_incident_at(image, text, incident, Utc::now())
    }

    /// Record a new incident created at `now`.
    ///
    /// The storage vector is fused with the same rule and default weights as queries.
    pub fn record_incident_at(
        &self,
        image: Option<&[f32]>,
        text: Option<&[f32]>,
        incident: NewIncident,
        now: DateTime<Utc>,
    ) -> RecallResult<IncidentId> {
        let vector = self.fusion.fuse_default(image, text)?;
        let record = IncidentRecordBuilder::new(IncidentId::generate(), incident.crisis_type, vector)
            .created_at(now)
            .metadata(incident.metadata)
            .origin(Origin::Submitted)
            .build();
        let stored = self.index.insert(record)?;
        log::info!(
            "Recorded {} incident {} (index size {})",
            stored.crisis_type,
            stored.id,
            self.index.len()
        );
        Ok(stored.id.clone())
    }

    /// Embed raw inputs into a query request. Provider failures propagate as-is.
    pub fn embed_request(
        &self,
        provider: &dyn EmbeddingProvider,
        image: Option<&[u8]>,
        text: Option<&str>,
    ) -> RecallResult<QueryRequest> {
        let image = image.map(|bytes| provider.embed_image(bytes)).transpose()?;
        let text = text.map(|t| provider.embed_text(t)).transpose()?;
        Ok(QueryRequest {
            image,
            text,
            ..QueryRequest::default()
        })
    }

    /// Embed raw inputs and search with the configured defaults.
    pub fn find_similar_embedded(
        &self,
        provider: &dyn EmbeddingProvider,
        image: Option<&[u8]>,
        text: Option<&str>,
    ) -> RecallResult<Vec<ScoredResult>> {
        let request = self.embed_request(provider, image, text)?;
        self.find_similar(&request)
    }

    /// Embed raw inputs and record them as a new incident.
    pub fn record_incident_embedded(
        &self,
        provider: &dyn EmbeddingProvider,
        image: Option<&[u8]>,
        text: Option<&str>,
        incident: NewIncident,
    ) -> RecallResult<IncidentId> {
        let request = self.embed_request(provider, image, text)?;
        self.record_incident(request.image.as_deref(), request.text.as_deref(), incident)
    }

    /// Insert curated seed records. Stops at the first failure; records
    /// inserted before it remain.
    pub fn load_seed(
        &self,
        seeds: Vec<SeedRecord>,
        provider: Option<&dyn EmbeddingProvider>,
    ) -> RecallResult<usize> {
        let total = seeds.len();
        let mut loaded = 0;
        for seed in seeds {
            let record = seed.into_record(provider)?;
            self.index.insert(record)?;
            loaded += 1;
        }
        log::info!("Loaded {}/{} seed incidents", loaded, total);
        Ok(loaded)
    }

    /// Look up a stored incident.
    pub fn get(&self, id: &IncidentId) -> Option<Arc<IncidentRecord>> {
        self.index.get(id)
    }

    /// Record count per crisis type.
    pub fn catalog(&self) -> BTreeMap<CrisisType, usize> {
        self.index.count_by_type()
    }

    /// Summary of the index as of `now`.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        let records = self.index.records();
        let seed = records.iter().filter(|r| r.origin == Origin::Seed).count();
        let last_24h = self
            .index
            .created_between(now - Duration::hours(24), now)
            .len();
        Snapshot {
            total: records.len(),
            seed,
            submitted: records.len() - seed,
            last_24h,
            recent: self.index.most_recent(SNAPSHOT_RECENT),
            backend: self.index.backend_name(),
            accuracy: self.index.accuracy(),
            taken_at: now,
        }
    }

    /// Recommended response for `crisis_type`; unconfigured types escalate.
    pub fn suggest_protocol(&self, crisis_type: CrisisType) -> Protocol {
        self.protocols.suggest(crisis_type)
    }

    /// Reasoning path for a ranked result set.
    ///
    /// Each call logs one decision record at `info`.
    pub fn explain(&self, results: &[ScoredResult]) -> Explanation {
        let explanation = Explanation::from_results(results, &self.protocols);
        match (&explanation.best_match, &explanation.protocol) {
            (Some(m), Some(p)) => log::info!(
                "Decision: best={} type={} priority={} score={:.2}% considered={}",
                m.id,
                m.crisis_type,
                p.priority.name(),
                m.decayed_percent,
                explanation.considered
            ),
            _ => log::info!("Decision: no match, manual assessment"),
        }
        explanation
    }
}
