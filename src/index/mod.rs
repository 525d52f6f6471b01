//! Similarity index and its backends. Lookup indexes are updated incrementally on insert.

pub mod backend;
pub mod cluster_map;
pub mod memory_backend;
pub mod similarity;
pub mod store;
pub mod temporal_index;
pub mod type_index;

pub use backend::{sort_hits, Accuracy, Hit, IndexBackend};
pub use cluster_map::{ClusterMap, ClusterParams, ClusteredBackend};
pub use memory_backend::MemoryBackend;
pub use similarity::SimilarityIndex;
pub use store::RecordStore;
pub use temporal_index::TemporalIndex;
pub use type_index::TypeIndex;
