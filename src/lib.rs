//! IncidentRecall: multimodal retrieval of similar past incidents.
//!
//! Fuses an image embedding and a text embedding into one query vector, ranks
//! stored incident records by cosine similarity, and re-ranks them by recency.
//! New incidents can be recorded while queries run.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod index;
pub mod types;
pub mod vector;

// Re-export commonly used types at the crate root
pub use config::{BackendConfig, RecallConfig, SearchConfig};
pub use embedding::{EmbeddingProvider, HashingEmbedder};
pub use engine::{
    DecayBand, DecayPolicy, DecayRanker, Explanation, FusionEngine, ModalityWeights, NewIncident,
    Priority, Protocol, ProtocolBook, RetrievalService, SeedRecord, Snapshot,
};
pub use index::{Accuracy, ClusterParams, IndexBackend, SimilarityIndex};
pub use types::{
    CrisisType, EmbeddingError, IncidentId, IncidentRecord, IncidentRecordBuilder, Metadata,
    Origin, QueryFilter, QueryRequest, RecallError, RecallResult, ScoredResult, Vector,
    DEFAULT_DIMENSION, DEFAULT_TOP_K,
};
pub use vector::{combine, cosine_similarity, normalize};
