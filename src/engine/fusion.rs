//! Multimodal fusion: one hybrid vector from an image and/or text embedding.

use serde::{Deserialize, Serialize};

use crate::types::{RecallError, RecallResult, Vector};
use crate::vector::{combine, normalize};

/// Relative contribution of each modality when both are present.
///
/// Weights need not sum to 1; the fused vector is always re-normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalityWeights {
    pub image: f32,
    pub text: f32,
}

impl ModalityWeights {
    /// Create validated weights. Both must be finite and non-negative.
    pub fn new(image: f32, text: f32) -> RecallResult<Self> {
        let weights = Self { image, text };
        weights.validate()?;
        Ok(weights)
    }

    /// Check both weights are finite and non-negative, and not both zero.
    pub fn validate(&self) -> RecallResult<()> {
        for (modality, value) in [("image", self.image), ("text", self.text)] {
            if !value.is_finite() || value < 0.0 {
                return Err(RecallError::InvalidWeight { modality, value });
            }
        }
        if self.image == 0.0 && self.text == 0.0 {
            return Err(RecallError::InvalidWeight {
                modality: "image+text",
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for ModalityWeights {
    fn default() -> Self {
        Self {
            image: 0.6,
            text: 0.4,
        }
    }
}

/// Stateless fusion of modality vectors into the shared similarity space.
pub struct FusionEngine {
    dimension: usize,
    weights: ModalityWeights,
}

impl FusionEngine {
    /// Create a fusion engine for vectors of `dimension` with default weights.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            weights: ModalityWeights::default(),
        }
    }

    /// Create with explicit default weights.
    pub fn with_weights(dimension: usize, weights: ModalityWeights) -> RecallResult<Self> {
        weights.validate()?;
        Ok(Self { dimension, weights })
    }

    /// The configured default weights.
    pub fn weights(&self) -> ModalityWeights {
        self.weights
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Fuse using the engine's configured weights.
    pub fn fuse_default(&self, image: Option<&[f32]>, text: Option<&[f32]>) -> RecallResult<Vector> {
        self.fuse(image, text, self.weights)
    }

    /// Fuse up to two modality vectors into one unit vector.
    ///
    /// - both present: `normalize(w_i * image + w_t * text)`
    /// - one present: that vector normalized, weight ignored
    /// - neither: `InsufficientInput`
    ///
    /// A missing modality is never treated as a zero vector.
    pub fn fuse(
        &self,
        image: Option<&[f32]>,
        text: Option<&[f32]>,
        weights: ModalityWeights,
    ) -> RecallResult<Vector> {
        if let Some(v) = image {
            self.check_dimension("image vector", v)?;
        }
        if let Some(v) = text {
            self.check_dimension("text vector", v)?;
        }

        match (image, text) {
            (Some(img), Some(txt)) => {
                weights.validate()?;
                let hybrid = combine(img, weights.image, txt, weights.text)?;
                normalize(&hybrid).map_err(|_| RecallError::DegenerateVector {
                    context: "fused image+text vector",
                })
            }
            (Some(img), None) => normalize(img).map_err(|_| RecallError::DegenerateVector {
                context: "image vector",
            }),
            (None, Some(txt)) => normalize(txt).map_err(|_| RecallError::DegenerateVector {
                context: "text vector",
            }),
            (None, None) => Err(RecallError::InsufficientInput),
        }
    }

    fn check_dimension(&self, context: &'static str, v: &[f32]) -> RecallResult<()> {
        if v.len() != self.dimension {
            return Err(RecallError::DimensionMismatch {
                context,
                expected: self.dimension,
                got: v.len(),
            });
        }
        Ok(())
    }
}
