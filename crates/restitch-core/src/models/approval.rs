//! Human-review approval records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::job::StatusTone;

/// One human review decision on a pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: String,
    pub job_id: String,
    /// Name of the reviewed step. Some endpoints call this `agent_name`.
    #[serde(alias = "agent_name")]
    pub step_name: String,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub input_data: Option<Value>,
    #[serde(default)]
    pub output_data: Option<Value>,
    /// Present when the reviewer approved with changes; the chain continues
    /// in a new job seeded with this output.
    #[serde(default)]
    pub modified_output: Option<Value>,
}

/// Review decision states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for a reviewer.
    Pending,
    /// Approved as-is.
    Approved,
    /// Rejected; the run does not continue past this step.
    Rejected,
    /// Approved with changes; a resume job continues the run.
    Modified,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Modified => "modified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "modified" => Some(Self::Modified),
            _ => None,
        }
    }

    /// Semantic color, on the same scale as step statuses.
    pub fn tone(&self) -> StatusTone {
        match self {
            Self::Pending => StatusTone::Warning,
            Self::Approved => StatusTone::Success,
            Self::Rejected => StatusTone::Error,
            Self::Modified => StatusTone::Info,
        }
    }
}
