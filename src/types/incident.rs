//! Incident records and their descriptive enums.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Vector;
use crate::types::error::{RecallError, RecallResult};

/// Opaque descriptive attributes (location, narrative, severity, ...).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Unique, immutable identifier of an incident record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(String);

impl IncidentId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier for a runtime-submitted incident.
    pub fn generate() -> Self {
        Self(format!("incident-{}", uuid::Uuid::new_v4()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IncidentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for IncidentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The kind of crisis an incident describes. Descriptive only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrisisType {
    Flood,
    Fire,
    Earthquake,
    Landslide,
    Cyclone,
    /// Submitted without a recognised type.
    #[serde(other)]
    Unknown,
}

impl CrisisType {
    /// Every variant, in display order.
    pub const ALL: [CrisisType; 6] = [
        Self::Flood,
        Self::Fire,
        Self::Earthquake,
        Self::Landslide,
        Self::Cyclone,
        Self::Unknown,
    ];

    /// Return a human-readable name for this crisis type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flood => "flood",
            Self::Fire => "fire",
            Self::Earthquake => "earthquake",
            Self::Landslide => "landslide",
            Self::Cyclone => "cyclone",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a crisis type from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "flood" => Some(Self::Flood),
            "fire" => Some(Self::Fire),
            "earthquake" => Some(Self::Earthquake),
            "landslide" => Some(Self::Landslide),
            "cyclone" => Some(Self::Cyclone),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for CrisisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Curated baseline record loaded at startup.
    Seed,
    /// Added at runtime through `record_incident`.
    Submitted,
}

impl Origin {
    /// Lowercase name, as used in seed files and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single historical incident, the unit stored in the similarity index.
///
/// Records are immutable once built; the index hands them out behind `Arc`.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentRecord {
    /// Unique identifier.
    pub id: IncidentId,
    /// Position in similarity space.
    #[serde(skip_serializing)]
    pub vector: Vector,
    /// Descriptive crisis category.
    pub crisis_type: CrisisType,
    /// When the incident entered the index (or, for seeds, when it happened).
    pub created_at: DateTime<Utc>,
    /// Descriptive attributes, never interpreted by ranking.
    pub metadata: Metadata,
    /// Seed or runtime submission.
    pub origin: Origin,
}

impl IncidentRecord {
    /// Validate this record's vector against the index dimension.
    pub fn validate(&self, dimension: usize) -> RecallResult<()> {
        if self.vector.len() != dimension {
            return Err(RecallError::DimensionMismatch {
                context: "record vector",
                expected: dimension,
                got: self.vector.len(),
            });
        }
        if crate::vector::is_zero(&self.vector) || !crate::vector::l2_norm(&self.vector).is_finite()
        {
            return Err(RecallError::DegenerateVector {
                context: "record vector",
            });
        }
        Ok(())
    }
}

/// Builder for constructing IncidentRecord instances ergonomically.
pub struct IncidentRecordBuilder {
    id: IncidentId,
    crisis_type: CrisisType,
    vector: Vector,
    created_at: Option<DateTime<Utc>>,
    metadata: Metadata,
    origin: Origin,
}

impl IncidentRecordBuilder {
    /// Create a new builder with the required fields. Origin defaults to seed.
    pub fn new(id: impl Into<IncidentId>, crisis_type: CrisisType, vector: Vector) -> Self {
        Self {
            id: id.into(),
            crisis_type,
            vector,
            created_at: None,
            metadata: Metadata::new(),
            origin: Origin::Seed,
        }
    }

    /// Set the creation timestamp.
    pub fn created_at(mut self, ts: DateTime<Utc>) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Replace the metadata map.
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add a single metadata attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the origin.
    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Build the record. A missing timestamp means "now".
    pub fn build(self) -> IncidentRecord {
        IncidentRecord {
            id: self.id,
            vector: self.vector,
            crisis_type: self.crisis_type,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            metadata: self.metadata,
            origin: self.origin,
        }
    }
}
