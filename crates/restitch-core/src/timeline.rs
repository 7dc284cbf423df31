//! Composition of the chronological event timeline.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ApprovalRecord, JobStatus, StatusTone, StepDescriptor};

/// Per-job boundary metadata handed to the composer.
#[derive(Debug, Clone)]
pub struct ChainJobInfo {
    pub job_id: String,
    pub context_id: usize,
    pub is_root: bool,
    pub total_jobs: usize,
    /// Unknown when the record could not be fetched.
    pub status: Option<JobStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One entry in the composed timeline.
///
/// Every variant carries a timestamp (synthesized when the source data has
/// none) and the execution context it belongs to, so consumers can render
/// section breaks without re-deriving the labeling rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEvent {
    /// Section break at the start of an execution context.
    JobBoundary {
        timestamp: DateTime<Utc>,
        context_id: usize,
        job_id: String,
        label: String,
        /// 1-based position of the job in its chain.
        position: usize,
        total_jobs: usize,
    },
    Step {
        timestamp: DateTime<Utc>,
        context_id: usize,
        tone: StatusTone,
        step: StepDescriptor,
    },
    Approval {
        timestamp: DateTime<Utc>,
        context_id: usize,
        tone: StatusTone,
        approval: ApprovalRecord,
    },
    JobCompletion {
        timestamp: DateTime<Utc>,
        context_id: usize,
        job_id: String,
        status: JobStatus,
        tone: StatusTone,
    },
}

impl TimelineEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::JobBoundary { timestamp, .. }
            | Self::Step { timestamp, .. }
            | Self::Approval { timestamp, .. }
            | Self::JobCompletion { timestamp, .. } => *timestamp,
        }
    }

    pub fn context_id(&self) -> usize {
        match self {
            Self::JobBoundary { context_id, .. }
            | Self::Step { context_id, .. }
            | Self::Approval { context_id, .. }
            | Self::JobCompletion { context_id, .. } => *context_id,
        }
    }
}

/// Section label for an execution context.
pub fn boundary_label(context_id: usize) -> String {
    if context_id == 0 {
        "Initial Execution".to_owned()
    } else {
        format!("Resume After Approval {context_id}")
    }
}

// Merge rank within one timestamp: the boundary opens its section, then
// steps, then the approvals reviewing them, then the job's completion.
const RANK_BOUNDARY: u8 = 0;
const RANK_STEP: u8 = 1;
const RANK_APPROVAL: u8 = 2;
const RANK_COMPLETION: u8 = 3;

// Synthesized per-event offsets stay under the one-second spacing used
// between synthesized context anchors.
const MAX_STEP_OFFSET_MS: i64 = 998;
const COMPLETION_OFFSET_MS: i64 = 999;

/// Interleave steps, approvals, and job boundaries into one chronological
/// stream.
///
/// Events are merged by timestamp, falling back to (execution_context_id,
/// step_number) when timestamps are absent or tied. Missing timestamps are
/// synthesized from the owning job's anchor (its `created_at`, or the
/// previous anchor plus one second) so every emitted event carries one.
/// Exactly one boundary marker is emitted per execution context, and each
/// chain job that reached a terminal status contributes a completion event.
pub fn compose_timeline(
    steps: &[StepDescriptor],
    approvals: &[ApprovalRecord],
    jobs: &[ChainJobInfo],
) -> Vec<TimelineEvent> {
    let mut anchors: Vec<DateTime<Utc>> = Vec::with_capacity(jobs.len());
    for (position, job) in jobs.iter().enumerate() {
        let fallback = match position {
            0 => DateTime::<Utc>::UNIX_EPOCH,
            _ => anchors[position - 1] + Duration::seconds(1),
        };
        anchors.push(job.created_at.unwrap_or(fallback));
    }

    let context_of: HashMap<&str, usize> = jobs
        .iter()
        .map(|job| (job.job_id.as_str(), job.context_id))
        .collect();
    let anchor = |context_id: usize| {
        anchors
            .get(context_id)
            .copied()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    };

    // (timestamp, context, step ordinal, rank) totally orders the merge.
    let mut keyed: Vec<(DateTime<Utc>, usize, u32, u8, TimelineEvent)> = Vec::new();

    for job in jobs {
        let timestamp = anchor(job.context_id);
        keyed.push((
            timestamp,
            job.context_id,
            0,
            RANK_BOUNDARY,
            TimelineEvent::JobBoundary {
                timestamp,
                context_id: job.context_id,
                job_id: job.job_id.clone(),
                label: if job.is_root {
                    boundary_label(0)
                } else {
                    boundary_label(job.context_id)
                },
                position: job.context_id + 1,
                total_jobs: job.total_jobs,
            },
        ));
    }

    for step in steps {
        let context_id = step.execution_context_id;
        let timestamp = step.completed_at.unwrap_or_else(|| {
            anchor(context_id) + Duration::milliseconds(step_offset(step.step_number))
        });
        keyed.push((
            timestamp,
            context_id,
            step.step_number,
            RANK_STEP,
            TimelineEvent::Step {
                timestamp,
                context_id,
                tone: step.status.tone(),
                step: step.clone(),
            },
        ));
    }

    for approval in approvals {
        let context_id = context_of
            .get(approval.job_id.as_str())
            .copied()
            .unwrap_or(0);
        // An approval sorts right behind the step it reviews; one without a
        // matching step closes out its context.
        let step_number = steps
            .iter()
            .find(|step| {
                step.owning_job_id == approval.job_id && step.step_name == approval.step_name
            })
            .map(|step| step.step_number)
            .unwrap_or(u32::MAX);
        let timestamp = approval.reviewed_at.unwrap_or_else(|| {
            anchor(context_id) + Duration::milliseconds(step_offset(step_number))
        });
        keyed.push((
            timestamp,
            context_id,
            step_number,
            RANK_APPROVAL,
            TimelineEvent::Approval {
                timestamp,
                context_id,
                tone: approval.status.tone(),
                approval: approval.clone(),
            },
        ));
    }

    for job in jobs {
        let Some(status) = job.status else { continue };
        if !status.is_terminal() {
            continue;
        }
        let timestamp = job
            .completed_at
            .unwrap_or_else(|| anchor(job.context_id) + Duration::milliseconds(COMPLETION_OFFSET_MS));
        keyed.push((
            timestamp,
            job.context_id,
            u32::MAX,
            RANK_COMPLETION,
            TimelineEvent::JobCompletion {
                timestamp,
                context_id: job.context_id,
                job_id: job.job_id.clone(),
                status,
                tone: status.tone(),
            },
        ));
    }

    keyed.sort_by(|a, b| (a.0, a.1, a.2, a.3).cmp(&(b.0, b.1, b.2, b.3)));
    keyed.into_iter().map(|(.., event)| event).collect()
}

fn step_offset(step_number: u32) -> i64 {
    i64::from(step_number.min(MAX_STEP_OFFSET_MS as u32 - 1)) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovalStatus;
    use chrono::TimeZone;

    fn job(context_id: usize, job_id: &str, total: usize) -> ChainJobInfo {
        ChainJobInfo {
            job_id: job_id.to_owned(),
            context_id,
            is_root: context_id == 0,
            total_jobs: total,
            status: None,
            created_at: None,
            completed_at: None,
        }
    }

    fn step(context_id: usize, job_id: &str, number: u32, name: &str) -> StepDescriptor {
        let mut step = StepDescriptor::new(number, name, JobStatus::Completed);
        step.owning_job_id = job_id.to_owned();
        step.execution_context_id = context_id;
        step
    }

    fn approval(job_id: &str, step_name: &str, status: ApprovalStatus) -> ApprovalRecord {
        ApprovalRecord {
            id: format!("ap-{job_id}-{step_name}"),
            job_id: job_id.to_owned(),
            step_name: step_name.to_owned(),
            status,
            reviewed_by: None,
            reviewed_at: None,
            input_data: None,
            output_data: None,
            modified_output: None,
        }
    }

    #[test]
    fn test_boundary_labels() {
        assert_eq!(boundary_label(0), "Initial Execution");
        assert_eq!(boundary_label(2), "Resume After Approval 2");
    }

    #[test]
    fn test_one_boundary_per_context() {
        let jobs = vec![job(0, "a", 3), job(1, "b", 3), job(2, "c", 3)];
        let steps = vec![
            step(0, "a", 1, "seo_keywords"),
            step(1, "b", 1, "article_generation"),
            step(2, "c", 1, "publishing"),
        ];
        let timeline = compose_timeline(&steps, &[], &jobs);

        let boundaries: Vec<(usize, &str)> = timeline
            .iter()
            .filter_map(|event| match event {
                TimelineEvent::JobBoundary { context_id, label, .. } => {
                    Some((*context_id, label.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            boundaries,
            [
                (0, "Initial Execution"),
                (1, "Resume After Approval 1"),
                (2, "Resume After Approval 2")
            ]
        );

        let mut contexts: Vec<usize> = timeline.iter().map(TimelineEvent::context_id).collect();
        contexts.dedup();
        assert_eq!(contexts, [0, 1, 2]);
    }

    #[test]
    fn test_boundary_precedes_its_steps() {
        let jobs = vec![job(0, "a", 2), job(1, "b", 2)];
        let steps = vec![step(0, "a", 1, "x"), step(1, "b", 1, "y")];
        let timeline = compose_timeline(&steps, &[], &jobs);
        assert!(matches!(
            timeline[0],
            TimelineEvent::JobBoundary { context_id: 0, .. }
        ));
        assert!(matches!(timeline[1], TimelineEvent::Step { context_id: 0, .. }));
        assert!(matches!(
            timeline[2],
            TimelineEvent::JobBoundary { context_id: 1, .. }
        ));
    }

    #[test]
    fn test_approval_sorts_behind_its_step() {
        let jobs = vec![job(0, "a", 1)];
        let steps = vec![
            step(0, "a", 1, "seo_keywords"),
            step(0, "a", 2, "article_generation"),
        ];
        let approvals = vec![approval("a", "seo_keywords", ApprovalStatus::Approved)];
        let timeline = compose_timeline(&steps, &approvals, &jobs);

        let kinds: Vec<&str> = timeline
            .iter()
            .map(|event| match event {
                TimelineEvent::JobBoundary { .. } => "boundary",
                TimelineEvent::Step { step, .. } => step.step_name.as_str(),
                TimelineEvent::Approval { .. } => "approval",
                TimelineEvent::JobCompletion { .. } => "completion",
            })
            .collect();
        assert_eq!(kinds, ["boundary", "seo_keywords", "approval", "article_generation"]);
    }

    #[test]
    fn test_real_timestamps_dominate() {
        let at = |secs: u32| Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, secs).unwrap();
        let mut jobs = vec![job(0, "a", 1)];
        jobs[0].created_at = Some(at(0));
        let mut early = step(0, "a", 2, "later_numbered_but_earlier");
        early.completed_at = Some(at(5));
        let mut late = step(0, "a", 1, "earlier_numbered_but_later");
        late.completed_at = Some(at(30));
        let timeline = compose_timeline(&[early, late], &[], &jobs);
        let names: Vec<&str> = timeline
            .iter()
            .filter_map(|event| match event {
                TimelineEvent::Step { step, .. } => Some(step.step_name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["later_numbered_but_earlier", "earlier_numbered_but_later"]);
    }

    #[test]
    fn test_terminal_job_emits_completion_last() {
        let mut root = job(0, "a", 1);
        root.status = Some(JobStatus::Completed);
        let steps = vec![step(0, "a", 1, "x"), step(0, "a", 2, "y")];
        let timeline = compose_timeline(&steps, &[], &[root]);
        assert!(matches!(
            timeline.last(),
            Some(TimelineEvent::JobCompletion {
                status: JobStatus::Completed,
                tone: StatusTone::Success,
                ..
            })
        ));
    }

    #[test]
    fn test_non_terminal_job_emits_no_completion() {
        let mut root = job(0, "a", 1);
        root.status = Some(JobStatus::WaitingForApproval);
        let timeline = compose_timeline(&[step(0, "a", 1, "x")], &[], &[root]);
        assert!(
            !timeline
                .iter()
                .any(|event| matches!(event, TimelineEvent::JobCompletion { .. }))
        );
    }

    #[test]
    fn test_every_event_has_a_timestamp_and_order_is_monotone() {
        let jobs = vec![job(0, "a", 2), job(1, "b", 2)];
        let steps = vec![step(0, "a", 1, "x"), step(1, "b", 1, "y")];
        let approvals = vec![approval("a", "x", ApprovalStatus::Modified)];
        let timeline = compose_timeline(&steps, &approvals, &jobs);
        let stamps: Vec<DateTime<Utc>> = timeline.iter().map(TimelineEvent::timestamp).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
