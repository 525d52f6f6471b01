//! Response protocols: the recommended priority and actions per crisis type.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{CrisisType, RecallError, RecallResult};

/// Action returned for a crisis type with no configured protocol.
pub const ESCALATE_ACTION: &str = "Unknown crisis type. Escalate to command center immediately.";

/// Urgency of a response protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_uppercase())
    }
}

/// Recommended response for one crisis type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub priority: Priority,
    /// Ordered steps; never empty in a validated book.
    pub actions: Vec<String>,
}

impl Protocol {
    pub fn new<S: Into<String>>(priority: Priority, actions: impl IntoIterator<Item = S>) -> Self {
        Self {
            priority,
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Critical escalation used when a crisis type has no entry.
    pub fn escalate() -> Self {
        Self::new(Priority::Critical, [ESCALATE_ACTION])
    }
}

/// Protocols keyed by crisis type.
///
/// In TOML each entry is a `[protocols.<type>]` table. A configured table
/// replaces the built-in book entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Protocol>",
    into = "BTreeMap<String, Protocol>"
)]
pub struct ProtocolBook {
    protocols: BTreeMap<CrisisType, Protocol>,
}

impl ProtocolBook {
    /// A book with no entries; every lookup escalates.
    pub fn empty() -> Self {
        Self {
            protocols: BTreeMap::new(),
        }
    }

    /// Add or replace the protocol for `crisis_type`.
    pub fn with(mut self, crisis_type: CrisisType, protocol: Protocol) -> Self {
        self.protocols.insert(crisis_type, protocol);
        self
    }

    pub fn get(&self, crisis_type: CrisisType) -> Option<&Protocol> {
        self.protocols.get(&crisis_type)
    }

    /// Protocol for `crisis_type`, falling back to [`Protocol::escalate`].
    pub fn suggest(&self, crisis_type: CrisisType) -> Protocol {
        self.get(crisis_type)
            .cloned()
            .unwrap_or_else(Protocol::escalate)
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    /// Every protocol must list at least one non-blank action.
    pub fn validate(&self) -> RecallResult<()> {
        for (crisis_type, protocol) in &self.protocols {
            if protocol.actions.is_empty() {
                return Err(RecallError::InvalidConfig(format!(
                    "protocols.{} has no actions",
                    crisis_type
                )));
            }
            if protocol.actions.iter().any(|a| a.trim().is_empty()) {
                return Err(RecallError::InvalidConfig(format!(
                    "protocols.{} has a blank action",
                    crisis_type
                )));
            }
        }
        Ok(())
    }
}

impl Default for ProtocolBook {
    fn default() -> Self {
        Self::empty()
            .with(
                CrisisType::Flood,
                Protocol::new(
                    Priority::High,
                    [
                        "Deploy rescue boats to low-lying districts",
                        "Open evacuation shelters on high ground",
                        "Cut power to submerged substations",
                    ],
                ),
            )
            .with(
                CrisisType::Fire,
                Protocol::new(
                    Priority::Critical,
                    [
                        "Dispatch fire brigades and set a perimeter",
                        "Evacuate buildings downwind of the blaze",
                        "Alert nearby hospitals for burn casualties",
                    ],
                ),
            )
            .with(
                CrisisType::Earthquake,
                Protocol::new(
                    Priority::Critical,
                    [
                        "Send search and rescue teams to collapsed structures",
                        "Shut off damaged gas mains",
                        "Set up field triage outside the damage zone",
                    ],
                ),
            )
            .with(
                CrisisType::Landslide,
                Protocol::new(
                    Priority::High,
                    [
                        "Close roads along the affected slope",
                        "Evacuate residents below the slide path",
                        "Hold re-entry until a geotechnical survey clears the area",
                    ],
                ),
            )
            .with(
                CrisisType::Cyclone,
                Protocol::new(
                    Priority::High,
                    [
                        "Move coastal residents into cyclone shelters",
                        "Secure loose structures and downed power lines",
                        "Stage relief supplies outside the landfall zone",
                    ],
                ),
            )
    }
}

impl TryFrom<BTreeMap<String, Protocol>> for ProtocolBook {
    type Error = RecallError;

    fn try_from(entries: BTreeMap<String, Protocol>) -> RecallResult<Self> {
        let mut book = Self::empty();
        for (name, protocol) in entries {
            let crisis_type = CrisisType::from_name(&name).ok_or_else(|| {
                RecallError::InvalidConfig(format!("protocols.{}: unknown crisis type", name))
            })?;
            book.protocols.insert(crisis_type, protocol);
        }
        book.validate()?;
        Ok(book)
    }
}

impl From<ProtocolBook> for BTreeMap<String, Protocol> {
    fn from(book: ProtocolBook) -> Self {
        book.protocols
            .into_iter()
            .map(|(crisis_type, protocol)| (crisis_type.name().to_string(), protocol))
            .collect()
    }
}
