//! High-level operations: fusion, decay ranking and the retrieval service.

pub mod decay;
pub mod explain;
pub mod fusion;
pub mod protocol;
pub mod retrieval;
pub mod seed;

pub use decay::{age_hours, decay_score, DecayBand, DecayPolicy, DecayRanker};
pub use explain::{Explanation, MatchSummary};
pub use fusion::{FusionEngine, ModalityWeights};
pub use protocol::{Priority, Protocol, ProtocolBook};
pub use retrieval::{NewIncident, RetrievalService, Snapshot};
pub use seed::{load_seed_file, parse_seed_json, SeedRecord};
