//! Human-readable reasoning path for a ranked result set.

use std::fmt;

use serde::Serialize;

use super::protocol::{Protocol, ProtocolBook};
use crate::types::{CrisisType, IncidentId, ScoredResult};

/// Why the top match was chosen.
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub id: IncidentId,
    pub crisis_type: CrisisType,
    /// Raw cosine similarity as a percentage, two decimals.
    pub similarity_percent: f32,
    /// Decayed score as a percentage, two decimals.
    pub decayed_percent: f32,
    pub age_hours: f64,
    pub decay_multiplier: f32,
    /// `metadata.location`, when it is a string.
    pub location: Option<String>,
    /// `metadata.description`, when it is a string.
    pub description: Option<String>,
}

/// Explanation of a ranking outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    /// Best match after decay, if any.
    pub best_match: Option<MatchSummary>,
    /// Recommended response for the best match's crisis type.
    pub protocol: Option<Protocol>,
    /// Number of results that were ranked.
    pub considered: usize,
}

fn percent(score: f32) -> f32 {
    (score * 10_000.0).round() / 100.0
}

fn metadata_str(result: &ScoredResult, key: &str) -> Option<String> {
    result
        .record
        .metadata
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

impl Explanation {
    /// Summarise already-reranked results; the first entry is the best match.
    pub fn from_results(results: &[ScoredResult], protocols: &ProtocolBook) -> Self {
        let best_match = results.first().map(|best| MatchSummary {
            id: best.record.id.clone(),
            crisis_type: best.record.crisis_type,
            similarity_percent: percent(best.raw_score),
            decayed_percent: percent(best.decayed_score),
            age_hours: (best.age_hours * 10.0).round() / 10.0,
            decay_multiplier: best.decay_multiplier,
            location: metadata_str(best, "location"),
            description: metadata_str(best, "description"),
        });
        let protocol = best_match.as_ref().map(|m| protocols.suggest(m.crisis_type));
        Self {
            best_match,
            protocol,
            considered: results.len(),
        }
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(m) = &self.best_match else {
            return writeln!(
                f,
                "No similar past incidents found. Recommend manual assessment."
            );
        };
        writeln!(f, "Best match: {} ({})", m.id, m.crisis_type)?;
        if let Some(description) = &m.description {
            writeln!(f, "  Description: {}", description)?;
        }
        if let Some(location) = &m.location {
            writeln!(f, "  Location: {}", location)?;
        }
        writeln!(f, "  Similarity: {:.2}%", m.similarity_percent)?;
        writeln!(f, "  Age: {:.1}h (decay x{:.2})", m.age_hours, m.decay_multiplier)?;
        writeln!(f, "  Final score: {:.2}%", m.decayed_percent)?;
        if let Some(protocol) = &self.protocol {
            writeln!(f, "  Priority: {}", protocol.priority)?;
            for (i, action) in protocol.actions.iter().enumerate() {
                writeln!(f, "    {}. {}", i + 1, action)?;
            }
        }
        writeln!(f, "  Ranked {} candidate(s)", self.considered)
    }
}
