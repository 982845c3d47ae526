use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payload::ImagePayload;

/// Provenance of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Produced from a catalog marketing scenario.
    Scenario,
    /// Produced from a free-form edit prompt.
    Edit,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scenario => "scenario",
            Self::Edit => "edit",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scenario" => Ok(Self::Scenario),
            "edit" => Ok(Self::Edit),
            _ => Err(format!("Invalid artifact kind: {}", s)),
        }
    }
}

/// One generated result.
///
/// Artifacts are immutable once built; the history only ever inserts or
/// deletes them as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub payload: ImagePayload,
    pub prompt: String,
    pub kind: ArtifactKind,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Build a new artifact with a fresh id and the current time.
    pub fn new(payload: ImagePayload, prompt: impl Into<String>, kind: ArtifactKind) -> Self {
        Self::with_timestamp(payload, prompt, kind, Utc::now())
    }

    /// Build a new artifact with a fresh id and an explicit creation time.
    pub fn with_timestamp(
        payload: ImagePayload,
        prompt: impl Into<String>,
        kind: ArtifactKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            prompt: prompt.into(),
            kind,
            created_at,
        }
    }
}

/// A request consumed by the orchestrator and discarded once it resolves.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub source: ImagePayload,
    pub kind: ArtifactKind,
}
