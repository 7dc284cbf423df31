//! Data model for chained pipeline job records.

mod approval;
mod job;
mod step;
mod view;

pub use approval::{ApprovalRecord, ApprovalStatus};
pub use job::{JobRecord, JobStatus, RESUME_JOB_TYPE, StatusTone};
pub use step::StepDescriptor;
pub use view::{ExecutionContext, JobResultsView, PerformanceMetrics};
