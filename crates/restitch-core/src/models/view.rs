//! The normalized view model exposed to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::job::JobStatus;
use super::step::StepDescriptor;
use crate::timeline::TimelineEvent;

/// One contiguous run of pipeline steps between approval-driven resume
/// boundaries. Context 0 is the initial run; context N is the run resumed
/// after the Nth approval edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub id: usize,
    /// The job record that owns this context.
    pub job_id: String,
}

/// Aggregate performance figures over every step in the chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Summed step execution time in seconds.
    pub total_execution_time: f64,
    pub total_tokens: u64,
    pub steps_completed: usize,
    pub steps_failed: usize,
}

impl PerformanceMetrics {
    pub fn from_steps(steps: &[StepDescriptor]) -> Self {
        let mut metrics = Self::default();
        for step in steps {
            metrics.total_execution_time += step.execution_time.unwrap_or(0.0);
            metrics.total_tokens += step.tokens_used.unwrap_or(0);
            match step.status {
                JobStatus::Completed => metrics.steps_completed += 1,
                JobStatus::Failed => metrics.steps_failed += 1,
                _ => {}
            }
        }
        metrics
    }
}

/// The reconstructed, chain-wide view of one logical pipeline run.
///
/// This is the contract with presentation layers; no wire format is
/// bit-exact, only this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResultsView {
    pub root_job_id: String,
    pub metadata: Map<String, Value>,
    /// Deduplicated steps, ordered by (execution context, step number).
    pub steps: Vec<StepDescriptor>,
    /// Steps, approvals, and job boundaries in chronological order.
    pub timeline: Vec<TimelineEvent>,
    /// Every chain job other than the root, in chain order.
    pub subjob_ids: Vec<String>,
    pub performance: PerformanceMetrics,
    pub quality_warnings: Vec<String>,
    pub contexts: Vec<ExecutionContext>,
}
