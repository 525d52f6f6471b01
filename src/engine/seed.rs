//! Curated seed records and their JSON file format.
//!
//! A seed file is a JSON array of objects:
//!
//! ```json
//! [
//!   {
//!     "id": "flood_001",
//!     "type": "flood",
//!     "created_at": "2024-07-14T06:00:00Z",
//!     "text": "Riverbank overflow in low-lying residential district",
//!     "metadata": { "location": "Assam", "severity": "high" }
//!   }
//! ]
//! ```
//!
//! Each entry carries either an explicit `vector` or a `text` to embed.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::types::{
    CrisisType, IncidentId, IncidentRecord, IncidentRecordBuilder, Metadata, Origin, RecallError,
    RecallResult, Vector,
};

/// One curated incident as it appears in a seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRecord {
    pub id: IncidentId,
    #[serde(rename = "type", alias = "crisis_type")]
    pub crisis_type: CrisisType,
    /// Documented incident time.
    pub created_at: DateTime<Utc>,
    /// Precomputed embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vector>,
    /// Narrative to embed when no vector is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SeedRecord {
    /// Resolve into an index record, embedding `text` if no vector was supplied.
    pub fn into_record(
        self,
        provider: Option<&dyn EmbeddingProvider>,
    ) -> RecallResult<IncidentRecord> {
        let vector = match (self.vector, self.text.as_deref(), provider) {
            (Some(v), _, _) => v,
            (None, Some(text), Some(provider)) => {
                let document = format!("{}: {}", self.crisis_type, text);
                provider.embed_text(&document)?
            }
            _ => return Err(RecallError::InsufficientInput),
        };

        let mut metadata = self.metadata;
        if let Some(text) = self.text {
            metadata
                .entry("description".to_string())
                .or_insert_with(|| serde_json::Value::String(text));
        }

        Ok(IncidentRecordBuilder::new(self.id, self.crisis_type, vector)
            .created_at(self.created_at)
            .metadata(metadata)
            .origin(Origin::Seed)
            .build())
    }
}

/// Parse seed records from a JSON string.
pub fn parse_seed_json(json: &str) -> RecallResult<Vec<SeedRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Read seed records from a JSON file.
pub fn load_seed_file(path: &Path) -> RecallResult<Vec<SeedRecord>> {
    let contents = std::fs::read_to_string(path)?;
    parse_seed_json(&contents)
}
