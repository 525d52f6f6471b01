//! Recency decay and re-ranking.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{IncidentRecord, RecallError, RecallResult, ScoredResult, SECONDS_PER_HOUR};

/// One step of the decay schedule: records at least `min_age_hours` old
/// (and younger than the next band) get `multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayBand {
    pub min_age_hours: f64,
    pub multiplier: f32,
}

/// Step-function decay schedule, monotonically non-increasing in age.
///
/// Default bands:
///
/// ```text
/// age in [0, 24)   -> 1.0
/// age in [24, 72)  -> 0.7
/// age >= 72        -> 0.3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DecayBand>", into = "Vec<DecayBand>")]
pub struct DecayPolicy {
    bands: Vec<DecayBand>,
}

impl DecayPolicy {
    /// Build a validated policy from bands sorted by `min_age_hours`.
    pub fn new(bands: Vec<DecayBand>) -> RecallResult<Self> {
        let first = bands
            .first()
            .ok_or_else(|| RecallError::InvalidDecayPolicy("no bands".into()))?;
        if first.min_age_hours != 0.0 {
            return Err(RecallError::InvalidDecayPolicy(format!(
                "first band must start at 0h, starts at {}h",
                first.min_age_hours
            )));
        }
        for band in &bands {
            if !band.min_age_hours.is_finite() {
                return Err(RecallError::InvalidDecayPolicy(format!(
                    "breakpoint {} is not finite",
                    band.min_age_hours
                )));
            }
            if !(band.multiplier > 0.0 && band.multiplier <= 1.0) {
                return Err(RecallError::InvalidDecayPolicy(format!(
                    "multiplier {} outside (0, 1]",
                    band.multiplier
                )));
            }
        }
        for pair in bands.windows(2) {
            if pair[1].min_age_hours <= pair[0].min_age_hours {
                return Err(RecallError::InvalidDecayPolicy(format!(
                    "breakpoints must strictly increase: {}h then {}h",
                    pair[0].min_age_hours, pair[1].min_age_hours
                )));
            }
            if pair[1].multiplier > pair[0].multiplier {
                return Err(RecallError::InvalidDecayPolicy(format!(
                    "multiplier increases with age at {}h: {} -> {}",
                    pair[1].min_age_hours, pair[0].multiplier, pair[1].multiplier
                )));
            }
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[DecayBand] {
        &self.bands
    }

    /// Multiplier for a record of the given age. Negative ages count as 0.
    pub fn multiplier(&self, age_hours: f64) -> f32 {
        let age = age_hours.max(0.0);
        self.bands
            .iter()
            .take_while(|b| b.min_age_hours <= age)
            .last()
            .map(|b| b.multiplier)
            .unwrap_or(1.0)
    }
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            bands: vec![
                DecayBand {
                    min_age_hours: 0.0,
                    multiplier: 1.0,
                },
                DecayBand {
                    min_age_hours: 24.0,
                    multiplier: 0.7,
                },
                DecayBand {
                    min_age_hours: 72.0,
                    multiplier: 0.3,
                },
            ],
        }
    }
}

impl TryFrom<Vec<DecayBand>> for DecayPolicy {
    type Error = RecallError;

    fn try_from(bands: Vec<DecayBand>) -> RecallResult<Self> {
        Self::new(bands)
    }
}

impl From<DecayPolicy> for Vec<DecayBand> {
    fn from(policy: DecayPolicy) -> Self {
        policy.bands
    }
}

/// Hours between `record.created_at` and `now`, clamped at 0 for future-dated records.
pub fn age_hours(record: &IncidentRecord, now: DateTime<Utc>) -> f64 {
    let elapsed = now.signed_duration_since(record.created_at);
    let seconds = elapsed.num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_HOUR).max(0.0)
}

/// Apply a recency multiplier to a raw similarity.
///
/// Positive scores shrink toward zero (`raw * m`). Negative scores move further
/// below zero (`raw * (2 - m)`), so an older record never outranks a newer one
/// with the same raw score, whatever its sign.
pub fn decay_score(raw_score: f32, multiplier: f32) -> f32 {
    if raw_score >= 0.0 {
        raw_score * multiplier
    } else {
        raw_score * (2.0 - multiplier)
    }
}

/// Re-scores candidates by recency and re-sorts them.
pub struct DecayRanker {
    policy: DecayPolicy,
}

impl DecayRanker {
    pub fn new(policy: DecayPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DecayPolicy {
        &self.policy
    }

    /// Fill in age, multiplier and decayed score for one result.
    pub fn score(&self, result: &mut ScoredResult, now: DateTime<Utc>) {
        let age = age_hours(&result.record, now);
        let multiplier = self.policy.multiplier(age);
        result.age_hours = age;
        result.decay_multiplier = multiplier;
        result.decayed_score = decay_score(result.raw_score, multiplier);
    }

    /// Apply decay and sort by decayed score, then raw score, then recency.
    ///
    /// The sort is stable: full ties keep the order they arrived in.
    pub fn rerank(&self, mut results: Vec<ScoredResult>, now: DateTime<Utc>) -> Vec<ScoredResult> {
        for result in &mut results {
            self.score(result, now);
        }
        results.sort_by(|a, b| {
            b.decayed_score
                .partial_cmp(&a.decayed_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.raw_score
                        .partial_cmp(&a.raw_score)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| b.record.created_at.cmp(&a.record.created_at))
        });
        results
    }
}

impl Default for DecayRanker {
    fn default() -> Self {
        Self::new(DecayPolicy::default())
    }
}
