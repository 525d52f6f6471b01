//! Error types for the incident retrieval engine.

use thiserror::Error;

use super::incident::IncidentId;

/// Failure reported by an external embedding provider.
///
/// The engine never produces this itself; it is carried through untouched.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("embedding unavailable ({modality}): {reason}")]
pub struct EmbeddingError {
    /// Which modality the provider was asked for ("image" or "text").
    pub modality: &'static str,
    /// Provider-supplied reason.
    pub reason: String,
}

impl EmbeddingError {
    /// Create a new embedding error for a modality.
    pub fn new(modality: &'static str, reason: impl Into<String>) -> Self {
        Self {
            modality,
            reason: reason.into(),
        }
    }
}

/// All errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum RecallError {
    /// Vectors of unequal or unexpected length.
    #[error("Vector dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// Zero-norm (or non-finite) vector where a direction is required.
    #[error("Degenerate vector in {context}: norm is zero or not finite")]
    DegenerateVector { context: &'static str },

    /// Neither an image nor a text vector was supplied.
    #[error("Insufficient input: at least one of image or text vector is required")]
    InsufficientInput,

    /// A record with this id already exists in the index.
    #[error("Duplicate incident id: {0}")]
    DuplicateId(IncidentId),

    /// Propagated verbatim from the embedding provider.
    #[error(transparent)]
    EmbeddingUnavailable(#[from] EmbeddingError),

    /// Modality weight negative or not finite.
    #[error("Invalid {modality} weight: {value}")]
    InvalidWeight { modality: &'static str, value: f32 },

    /// Decay bands violate ordering or range rules.
    #[error("Invalid decay policy: {0}")]
    InvalidDecayPolicy(String),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience result type for retrieval operations.
pub type RecallResult<T> = Result<T, RecallError>;
