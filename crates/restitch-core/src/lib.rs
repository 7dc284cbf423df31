//! # restitch-core
//!
//! Reconstructs a single, coherent execution history for a multi-step
//! content pipeline whose data is scattered across several linked job
//! records. A run starts as one job; every approval-with-changes continues
//! it as a brand-new job pointing back at the one it resumed. Given any job
//! id in such a chain, this crate discovers every linked job, normalizes
//! each job's result data, deduplicates and merges the steps, and
//! interleaves them with human-approval events into one chronologically
//! ordered, context-labeled timeline.
//!
//! The backend is abstracted behind the [`JobSource`] trait; see the
//! `restitch-client` crate for the HTTP binding.

pub mod aggregate;
pub mod cache;
pub mod chain;
pub mod controller;
mod error;
pub mod models;
pub mod normalize;
pub mod source;
pub mod timeline;

pub use aggregate::{JobSteps, StepSource, aggregate_steps};
pub use cache::{StepOutputCache, StepOutputSink};
pub use chain::{ChainWalk, walk_chain, walk_from};
pub use controller::JobDetailsController;
pub use error::{Error, Result};
pub use models::{
    ApprovalRecord, ApprovalStatus, ExecutionContext, JobRecord, JobResultsView, JobStatus,
    PerformanceMetrics, StatusTone, StepDescriptor,
};
pub use normalize::{NormalizedResult, normalize_result};
pub use source::{JobSource, ResultsSummary, SourceError};
pub use timeline::{ChainJobInfo, TimelineEvent, boundary_label, compose_timeline};
