//! The capability seam between the reconstruction engine and whatever
//! backend actually stores job records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{ApprovalRecord, ApprovalStatus, JobRecord, StepDescriptor};

/// Errors a [`JobSource`] implementation can report.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    #[error("request failed with HTTP {status} during {operation}")]
    HttpStatus { status: u16, operation: &'static str },

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("decode error: {reason}")]
    Decode { reason: String },

    #[error("source unavailable: {reason}")]
    Unavailable { reason: String },
}

impl SourceError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Pre-shaped per-job results as returned by the summary endpoint.
///
/// Not every job has one; the reconstruction falls back to normalizing the
/// job's raw result payload when the summary endpoint answers not-found.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsSummary {
    #[serde(default)]
    pub steps: Vec<StepDescriptor>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub subjobs: Vec<String>,
    #[serde(default)]
    pub quality_warnings: Vec<String>,
}

/// Fetch capabilities consumed by the reconstruction engine.
///
/// Implementations are opaque to the core; see `restitch-client` for the
/// HTTP binding and the integration tests for an in-memory one.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Fetch a single job record by id.
    async fn fetch_job(&self, job_id: &str) -> Result<JobRecord, SourceError>;

    /// Fetch a job's raw result payload. The shape is endpoint-dependent;
    /// callers must normalize it before use.
    async fn fetch_job_result(&self, job_id: &str) -> Result<Value, SourceError>;

    /// Fetch the pre-shaped results summary for a job, or `None` when the
    /// backend has none for it.
    async fn fetch_results_summary(
        &self,
        job_id: &str,
    ) -> Result<Option<ResultsSummary>, SourceError>;

    /// Fetch approval records for a job, optionally filtered by status.
    async fn fetch_approvals(
        &self,
        job_id: &str,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ApprovalRecord>, SourceError>;
}
