//! Step descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::job::JobStatus;

/// Summary of one pipeline step's execution outcome.
///
/// `step_number` is an ordinal within the owning job only; two jobs in the
/// same chain routinely both have a step 1. The globally unique identity of
/// a step is `(owning_job_id, step_name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub step_number: u32,
    pub step_name: String,
    pub status: JobStatus,
    /// Wall-clock execution time in seconds.
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Opaque step output, kept so detail views need no second fetch.
    #[serde(default)]
    pub output: Option<Value>,
    /// Filled in during aggregation.
    #[serde(default)]
    pub owning_job_id: String,
    /// Position of the owning job in its chain; filled in during aggregation.
    #[serde(default)]
    pub execution_context_id: usize,
}

impl StepDescriptor {
    pub fn new(step_number: u32, step_name: impl Into<String>, status: JobStatus) -> Self {
        Self {
            step_number,
            step_name: step_name.into(),
            status,
            execution_time: None,
            tokens_used: None,
            error_message: None,
            completed_at: None,
            output: None,
            owning_job_id: String::new(),
            execution_context_id: 0,
        }
    }
}
