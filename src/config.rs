//! Engine configuration with TOML persistence.
//!
//! Every tunable has a documented default, so an empty TOML document is a
//! valid configuration:
//!
//! ```toml
//! dimension = 512
//!
//! [fusion]
//! image = 0.6
//! text = 0.4
//!
//! [search]
//! default_k = 3
//! min_score = 0.0
//!
//! [[decay]]
//! min_age_hours = 0.0
//! multiplier = 1.0
//!
//! [backend]
//! kind = "memory"
//!
//! [protocols.flood]
//! priority = "high"
//! actions = ["Deploy rescue boats to low-lying districts"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::decay::DecayPolicy;
use crate::engine::fusion::ModalityWeights;
use crate::engine::protocol::ProtocolBook;
use crate::index::ClusterParams;
use crate::types::{RecallError, RecallResult, DEFAULT_DIMENSION, DEFAULT_TOP_K};

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    /// Embedding dimension shared by every vector.
    pub dimension: usize,

    /// Default modality weights.
    pub fusion: ModalityWeights,

    /// Query defaults.
    pub search: SearchConfig,

    /// Recency decay bands.
    pub decay: DecayPolicy,

    /// Index backend selection.
    pub backend: BackendConfig,

    /// Response protocol per crisis type.
    pub protocols: ProtocolBook,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results returned when a request does not set `k`.
    pub default_k: usize,

    /// Minimum raw similarity when a request does not set one.
    pub min_score: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_k: DEFAULT_TOP_K,
            min_score: 0.0,
        }
    }
}

/// Which index backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Exact linear scan.
    Memory,
    /// Approximate k-means probing.
    Clustered(ClusterParams),
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Memory
    }
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            fusion: ModalityWeights::default(),
            search: SearchConfig::default(),
            decay: DecayPolicy::default(),
            backend: BackendConfig::default(),
            protocols: ProtocolBook::default(),
        }
    }
}

impl RecallConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> RecallResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> RecallResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> RecallResult<String> {
        toml::to_string(self).map_err(|e| RecallError::InvalidConfig(e.to_string()))
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> RecallResult<()> {
        if self.dimension == 0 {
            return Err(RecallError::InvalidConfig("dimension must be > 0".into()));
        }
        self.fusion.validate()?;
        if self.search.default_k == 0 {
            return Err(RecallError::InvalidConfig(
                "search.default_k must be > 0".into(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.search.min_score) {
            return Err(RecallError::InvalidConfig(format!(
                "search.min_score {} outside [-1, 1]",
                self.search.min_score
            )));
        }
        if let BackendConfig::Clustered(params) = &self.backend {
            if params.n_probe == 0 || params.max_iterations == 0 {
                return Err(RecallError::InvalidConfig(
                    "backend.n_probe and backend.max_iterations must be > 0".into(),
                ));
            }
        }
        self.protocols.validate()
    }
}
