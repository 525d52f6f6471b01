//! Fixed-length vector arithmetic: norms, weighted combination, cosine similarity.
//!
//! Every operation is length-checked. Accumulation happens in `f64` so that
//! self-similarity of a non-zero vector comes out as exactly 1.0 after clamping.

use crate::types::{RecallError, RecallResult, Vector};

/// Dot product. Caller guarantees equal length.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum()
}

/// Euclidean (L2) norm.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| x as f64 * x as f64).sum::<f64>().sqrt()
}

/// Whether every component is zero.
pub fn is_zero(v: &[f32]) -> bool {
    v.iter().all(|&x| x == 0.0)
}

fn check_len(context: &'static str, a: &[f32], b: &[f32]) -> RecallResult<()> {
    if a.len() != b.len() {
        return Err(RecallError::DimensionMismatch {
            context,
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(())
}

/// Scale `v` to unit L2 norm.
///
/// Fails with `DegenerateVector` when the norm is zero or not finite,
/// since the direction is undefined.
pub fn normalize(v: &[f32]) -> RecallResult<Vector> {
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return Err(RecallError::DegenerateVector {
            context: "normalize",
        });
    }
    Ok(v.iter().map(|&x| (x as f64 / norm) as f32).collect())
}

/// Elementwise `w1 * v1 + w2 * v2`. Does not re-normalize.
pub fn combine(v1: &[f32], w1: f32, v2: &[f32], w2: f32) -> RecallResult<Vector> {
    check_len("combine", v1, v2)?;
    Ok(v1
        .iter()
        .zip(v2.iter())
        .map(|(&a, &b)| w1 * a + w2 * b)
        .collect())
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`, clamped to [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> RecallResult<f32> {
    check_len("cosine_similarity", a, b)?;
    let denom = l2_norm(a) * l2_norm(b);
    if denom == 0.0 || !denom.is_finite() {
        return Err(RecallError::DegenerateVector {
            context: "cosine_similarity",
        });
    }
    Ok((dot(a, b) / denom).clamp(-1.0, 1.0) as f32)
}

/// Cosine similarity against a query whose norm is already known.
///
/// Used by index scans so the query norm is computed once per query.
pub(crate) fn cosine_with_norm(query: &[f32], query_norm: f64, other: &[f32]) -> Option<f32> {
    let denom = query_norm * l2_norm(other);
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((dot(query, other) / denom).clamp(-1.0, 1.0) as f32)
}
