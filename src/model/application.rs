use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome keys reported next to the stage counts in application statistics.
pub const ACCEPTED: &str = "Accepted";
pub const REJECTED: &str = "Rejected";

/// Review pipeline stages, in the order an application moves through them.
/// Stored in the `current_stage` / `stages` columns by display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Submitted,
    ResumeReview,
    Interview,
    FinalReview,
}

impl Stage {
    pub const ALL: [Self; 4] = [
        Self::Submitted,
        Self::ResumeReview,
        Self::Interview,
        Self::FinalReview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::ResumeReview => "Resume Review",
            Self::Interview => "Interview",
            Self::FinalReview => "Final Review",
        }
    }

    /// Validate a configured pipeline: non-empty, no repeats. The stages
    /// keep the order they were given in.
    pub fn normalize_pipeline(stages: &[Self]) -> Result<Vec<Self>, String> {
        if stages.is_empty() {
            return Err("a pipeline needs at least one stage".into());
        }
        let mut seen = std::collections::HashSet::with_capacity(stages.len());
        if !stages.iter().all(|stage| seen.insert(*stage)) {
            return Err("pipeline stages must not repeat".into());
        }
        Ok(stages.to_vec())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown pipeline stage: {s}"))
    }
}

impl serde::Serialize for Stage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Stage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub name: String,
    pub email: String,
    pub current_stage: String,
    pub completed: bool,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

/// An application as returned by the API. `current_stage` is only set while
/// the application is open; `accepted` only once it is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub role_id: Uuid,
    pub name: String,
    pub email: String,
    pub current_stage: Option<Stage>,
    pub completed: bool,
    pub accepted: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for ApplicationResponse {
    type Error = anyhow::Error;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        let current_stage = if row.completed {
            None
        } else {
            Some(row.current_stage.parse()?)
        };
        Ok(Self {
            id: row.id,
            role_id: row.role_id,
            name: row.name,
            email: row.email,
            current_stage,
            completed: row.completed,
            accepted: row.completed.then_some(row.accepted),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PipelineRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub role_name: String,
    pub stages: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineResponse {
    pub id: Uuid,
    pub role_id: Uuid,
    pub role_name: String,
    pub stages: Vec<Stage>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PipelineRow> for PipelineResponse {
    type Error = anyhow::Error;

    fn try_from(row: PipelineRow) -> Result<Self, Self::Error> {
        let stages = row
            .stages
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<Stage>, _>>()?;
        Ok(Self {
            id: row.id,
            role_id: row.role_id,
            role_name: row.role_name,
            stages,
            created_at: row.created_at,
        })
    }
}
