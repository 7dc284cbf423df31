//! Job records and status enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Job type string a resume job carries when the backend does not set the
/// `original_job_id` pointer on the record itself.
pub const RESUME_JOB_TYPE: &str = "resume_pipeline";

const RESUME_POINTER_KEY: &str = "resume_job_id";
const ORIGINAL_POINTER_KEY: &str = "original_job_id";

/// One job record as fetched from the backend.
///
/// A logical pipeline run is scattered over several of these: every
/// approval-with-changes spawns a new record whose `original_job_id` points
/// back at the record it resumed, and the resumed record gains a forward
/// `resume_job_id` pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    #[serde(default)]
    pub job_type: String,
    pub status: JobStatus,
    /// Forward pointer to the job that continued this run, if any.
    #[serde(default)]
    pub resume_job_id: Option<String>,
    /// Back pointer to the job this run resumed, if any.
    #[serde(default)]
    pub original_job_id: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Opaque result payload; shape varies by backend endpoint.
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Forward pointer: the top-level field wins, metadata is the fallback.
    /// Older backend responses only carry the pointer inside `metadata`.
    pub fn resume_pointer(&self) -> Option<&str> {
        self.resume_job_id
            .as_deref()
            .or_else(|| self.metadata.get(RESUME_POINTER_KEY).and_then(Value::as_str))
    }

    /// Back pointer, with the same field-then-metadata fallback.
    pub fn original_pointer(&self) -> Option<&str> {
        self.original_job_id
            .as_deref()
            .or_else(|| {
                self.metadata
                    .get(ORIGINAL_POINTER_KEY)
                    .and_then(Value::as_str)
            })
    }

    /// Whether this record continues an earlier job rather than starting a
    /// run. The canonical reconstructed view is always anchored at the root.
    pub fn is_resume_job(&self) -> bool {
        self.original_pointer().is_some() || self.job_type == RESUME_JOB_TYPE
    }
}

/// Job status values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job was created and is waiting to be picked up.
    Pending,
    /// Job is queued behind other work.
    Queued,
    /// Job is currently executing.
    Processing,
    /// Job finished successfully.
    Completed,
    /// Job failed.
    Failed,
    /// Job was cancelled.
    Cancelled,
    /// Job is paused on a step awaiting human review.
    WaitingForApproval,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::WaitingForApproval => "waiting_for_approval",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "waiting_for_approval" => Some(Self::WaitingForApproval),
            _ => None,
        }
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Semantic color for rendering. Shares one mapping with
    /// [`ApprovalStatus`](crate::models::ApprovalStatus) so steps and
    /// approvals use the same iconography.
    pub fn tone(&self) -> StatusTone {
        match self {
            Self::Completed => StatusTone::Success,
            Self::Failed => StatusTone::Error,
            Self::Cancelled => StatusTone::Muted,
            Self::Pending | Self::WaitingForApproval => StatusTone::Warning,
            Self::Queued | Self::Processing => StatusTone::Info,
        }
    }
}

/// Semantic color classes shared by step and approval statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Success,
    Warning,
    Error,
    Info,
    Muted,
}
