//! All data types for the incident retrieval engine.

pub mod error;
pub mod incident;
pub mod query;

pub use error::{EmbeddingError, RecallError, RecallResult};
pub use incident::{
    CrisisType, IncidentId, IncidentRecord, IncidentRecordBuilder, Metadata, Origin,
};
pub use query::{QueryFilter, QueryRequest, ScoredResult};

/// A fixed-length embedding, the shared currency of every component.
pub type Vector = Vec<f32>;

/// Default embedding dimensionality (CLIP ViT-B/32 width).
pub const DEFAULT_DIMENSION: usize = 512;

/// Default number of results returned by a query.
pub const DEFAULT_TOP_K: usize = 3;

/// Seconds per hour, for age computations.
pub(crate) const SECONDS_PER_HOUR: f64 = 3600.0;
