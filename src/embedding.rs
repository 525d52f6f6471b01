//! Embedding provider boundary.
//!
//! Real deployments plug a vision/text encoder in behind [`EmbeddingProvider`].
//! [`HashingEmbedder`] is a deterministic, model-free stand-in used by the CLI
//! and tests.

use crate::types::{EmbeddingError, Vector};

/// Produces fixed-length vectors for raw image bytes and text.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed raw image bytes.
    fn embed_image(&self, image: &[u8]) -> Result<Vector, EmbeddingError>;

    /// Embed free text.
    fn embed_text(&self, text: &str) -> Result<Vector, EmbeddingError>;

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Provider name.
    fn name(&self) -> &str;
}

/// Feature-hashing embedder (no ML, fast, deterministic).
///
/// Text: each lowercase alphanumeric token adds ±1 to a hashed bucket.
/// Images: each 16-byte chunk of the payload does the same.
pub struct HashingEmbedder {
    dimension: usize,
}

const IMAGE_CHUNK: usize = 16;

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn accumulate(&self, v: &mut [f32], domain: &[u8], feature: &[u8]) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain);
        hasher.update(feature);
        let hash = hasher.finalize();
        let bytes = hash.as_bytes();
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&bytes[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign;
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed_image(&self, image: &[u8]) -> Result<Vector, EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::new("image", "embedder dimension is zero"));
        }
        if image.is_empty() {
            return Err(EmbeddingError::new("image", "empty image payload"));
        }
        let mut v = vec![0.0f32; self.dimension];
        for chunk in image.chunks(IMAGE_CHUNK) {
            self.accumulate(&mut v, b"image:", chunk);
        }
        Ok(v)
    }

    fn embed_text(&self, text: &str) -> Result<Vector, EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::new("text", "embedder dimension is zero"));
        }
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(EmbeddingError::new("text", "no tokens in input"));
        }
        let mut v = vec![0.0f32; self.dimension];
        for token in tokens {
            self.accumulate(&mut v, b"text:", token.as_bytes());
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
