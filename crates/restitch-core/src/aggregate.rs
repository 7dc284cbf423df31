//! Merging per-job step lists into one chain-wide sequence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::{JobStatus, StepDescriptor};

/// Where a job's steps come from. The summary endpoint hands back
/// pre-shaped descriptors; jobs without a summary only expose the raw
/// step_results map out of their result payload.
#[derive(Debug, Clone)]
pub enum StepSource {
    Shaped(Vec<StepDescriptor>),
    Raw(Map<String, Value>),
}

/// One chain job's contribution to the aggregation, in chain order.
#[derive(Debug, Clone)]
pub struct JobSteps {
    pub job_id: String,
    pub source: StepSource,
}

/// Merge per-job step sources into one deduplicated sequence.
///
/// Each descriptor is tagged with its owning job id and an execution
/// context id equal to the job's position in the chain. Within one job,
/// a step name reported twice is a retry: the later descriptor wins
/// wholesale. The output is ordered by (execution_context_id,
/// step_number) and is deterministic for identical inputs.
pub fn aggregate_steps(jobs: Vec<JobSteps>) -> Vec<StepDescriptor> {
    let mut ordered: Vec<StepDescriptor> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for (context_id, job) in jobs.into_iter().enumerate() {
        let JobSteps { job_id, source } = job;
        let descriptors: Vec<StepDescriptor> = match source {
            StepSource::Shaped(steps) => steps,
            StepSource::Raw(map) => map
                .iter()
                .enumerate()
                .map(|(position, (name, value))| {
                    synthesize_step(name, value, position as u32 + 1)
                })
                .collect(),
        };

        for mut step in descriptors {
            step.owning_job_id = job_id.clone();
            step.execution_context_id = context_id;
            let key = (step.owning_job_id.clone(), step.step_name.clone());
            match index.get(&key) {
                // Retry within one job: the most recent report wins.
                Some(&position) => ordered[position] = step,
                None => {
                    index.insert(key, ordered.len());
                    ordered.push(step);
                }
            }
        }
    }

    ordered.sort_by(|a, b| {
        (a.execution_context_id, a.step_number).cmp(&(b.execution_context_id, b.step_number))
    });
    ordered
}

/// Build a descriptor from one raw step_results entry.
///
/// Raw entries are loosely shaped: anything object-like may carry status
/// and timing fields, anything else is just the step's output.
fn synthesize_step(name: &str, value: &Value, ordinal: u32) -> StepDescriptor {
    let fields = value.as_object();

    let error_message = fields.and_then(|f| {
        f.get("error_message")
            .or_else(|| f.get("error"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    });

    let status = fields
        .and_then(|f| f.get("status"))
        .and_then(Value::as_str)
        .and_then(JobStatus::parse)
        .unwrap_or(if error_message.is_some() {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        });

    let step_number = fields
        .and_then(|f| f.get("step_number"))
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .unwrap_or(ordinal);

    StepDescriptor {
        step_number,
        step_name: name.to_owned(),
        status,
        execution_time: fields.and_then(|f| f.get("execution_time")).and_then(Value::as_f64),
        tokens_used: fields.and_then(|f| f.get("tokens_used")).and_then(Value::as_u64),
        error_message,
        completed_at: fields
            .and_then(|f| f.get("completed_at"))
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        output: Some(value.clone()),
        owning_job_id: String::new(),
        execution_context_id: 0,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_job(job_id: &str, steps: Value) -> JobSteps {
        JobSteps {
            job_id: job_id.to_owned(),
            source: StepSource::Raw(steps.as_object().unwrap().clone()),
        }
    }

    #[test]
    fn test_raw_map_synthesis_keeps_arrival_order() {
        let steps = aggregate_steps(vec![raw_job(
            "j1",
            json!({"zeta": {"status": "completed"}, "alpha": {"status": "failed", "error": "x"}}),
        )]);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_name, "zeta");
        assert_eq!(steps[0].step_number, 1);
        assert_eq!(steps[1].step_name, "alpha");
        assert_eq!(steps[1].step_number, 2);
        assert_eq!(steps[1].status, JobStatus::Failed);
        assert_eq!(steps[1].error_message.as_deref(), Some("x"));
    }

    #[test]
    fn test_context_and_owner_tagging() {
        let steps = aggregate_steps(vec![
            raw_job("j1", json!({"a": {}})),
            raw_job("j2", json!({"b": {}})),
        ]);
        assert_eq!(steps[0].owning_job_id, "j1");
        assert_eq!(steps[0].execution_context_id, 0);
        assert_eq!(steps[1].owning_job_id, "j2");
        assert_eq!(steps[1].execution_context_id, 1);
    }

    #[test]
    fn test_shaped_steps_are_retagged() {
        let mut shaped = StepDescriptor::new(3, "seo_keywords", JobStatus::Completed);
        shaped.owning_job_id = "stale".to_owned();
        shaped.execution_context_id = 9;
        let steps = aggregate_steps(vec![JobSteps {
            job_id: "j7".to_owned(),
            source: StepSource::Shaped(vec![shaped]),
        }]);
        assert_eq!(steps[0].owning_job_id, "j7");
        assert_eq!(steps[0].execution_context_id, 0);
        assert_eq!(steps[0].step_number, 3);
    }

    #[test]
    fn test_retry_dedup_later_wins() {
        let first = StepDescriptor::new(1, "seo_keywords", JobStatus::Failed);
        let mut retry = StepDescriptor::new(1, "seo_keywords", JobStatus::Completed);
        retry.execution_time = Some(4.2);
        let steps = aggregate_steps(vec![JobSteps {
            job_id: "j1".to_owned(),
            source: StepSource::Shaped(vec![first, retry]),
        }]);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].status, JobStatus::Completed);
        assert_eq!(steps[0].execution_time, Some(4.2));
    }

    #[test]
    fn test_same_name_across_jobs_is_not_deduped() {
        let steps = aggregate_steps(vec![
            raw_job("j1", json!({"seo_keywords": {}})),
            raw_job("j2", json!({"seo_keywords": {}})),
        ]);
        assert_eq!(steps.len(), 2);
    }

    #[test]
    fn test_ordering_and_idempotence() {
        let jobs = vec![
            JobSteps {
                job_id: "j1".to_owned(),
                source: StepSource::Shaped(vec![
                    StepDescriptor::new(2, "article_generation", JobStatus::Completed),
                    StepDescriptor::new(1, "seo_keywords", JobStatus::Completed),
                ]),
            },
            raw_job("j2", json!({"publishing": {}})),
        ];

        let first = aggregate_steps(jobs.clone());
        let second = aggregate_steps(jobs);
        let order: Vec<(usize, u32, &str)> = first
            .iter()
            .map(|s| (s.execution_context_id, s.step_number, s.step_name.as_str()))
            .collect();
        assert_eq!(
            order,
            [(0, 1, "seo_keywords"), (0, 2, "article_generation"), (1, 1, "publishing")]
        );
        let replay: Vec<(usize, u32, &str)> = second
            .iter()
            .map(|s| (s.execution_context_id, s.step_number, s.step_name.as_str()))
            .collect();
        assert_eq!(order, replay);
    }

    #[test]
    fn test_non_object_entry_becomes_completed_output() {
        let steps = aggregate_steps(vec![raw_job("j1", json!({"summary": "plain text"}))]);
        assert_eq!(steps[0].status, JobStatus::Completed);
        assert_eq!(steps[0].output, Some(json!("plain text")));
    }
}
