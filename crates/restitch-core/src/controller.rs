//! The single entry point: reconstructs the chain-wide view for a job id.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::aggregate::{JobSteps, StepSource, aggregate_steps};
use crate::cache::StepOutputSink;
use crate::chain::{ChainWalk, walk_from};
use crate::error::{Error, Result};
use crate::models::{
    ApprovalRecord, ExecutionContext, JobRecord, JobResultsView, PerformanceMetrics,
};
use crate::normalize::{NormalizedResult, normalize_result};
use crate::source::JobSource;
use crate::timeline::{ChainJobInfo, compose_timeline};

#[derive(Debug, Default)]
struct RequestState {
    generation: u64,
    target: String,
}

/// Orchestrates chain discovery, normalization, aggregation, and timeline
/// composition behind two fetch operations.
///
/// The step-output sink is injected here rather than registered through any
/// shared slot, and overlapping reconstructions are superseded explicitly:
/// a call that finishes after a newer call for a different target started
/// returns [`Error::Superseded`] instead of racing last-resolved-wins.
pub struct JobDetailsController<S> {
    source: S,
    sink: Arc<dyn StepOutputSink>,
    latest: Mutex<RequestState>,
}

impl<S: JobSource> JobDetailsController<S> {
    pub fn new(source: S, sink: Arc<dyn StepOutputSink>) -> Self {
        Self {
            source,
            sink,
            latest: Mutex::new(RequestState::default()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Reconstruct the full chain view for `job_id`.
    ///
    /// If the target is a resume job the view is transparently anchored at
    /// the chain root; the canonical reconstructed view is always the whole
    /// run. Only a failure to fetch `job_id` itself is an error; missing
    /// subjobs truncate the chain and unknown payload shapes contribute
    /// zero steps.
    pub async fn fetch_job_details(&self, job_id: &str) -> Result<JobResultsView> {
        let ticket = self.begin(job_id);

        let target = self
            .source
            .fetch_job(job_id)
            .await
            .map_err(|source| Error::root_fetch(job_id, source))?;
        if target.is_resume_job() {
            debug!(job_id = %job_id, "target is a resume job, anchoring view at the chain root");
        }

        let chain = walk_from(&self.source, target).await;
        if chain.root_id() != Some(job_id) {
            debug!(
                job_id = %job_id,
                root_id = chain.root_id().unwrap_or_default(),
                "redirected to chain root"
            );
        }

        let view = self.reconstruct(chain).await;
        self.finish(ticket, job_id)?;
        Ok(view)
    }

    /// Reconstruct a view scoped to a single chain link, bypassing the
    /// root redirect. Used for explicit drill-down into one subjob.
    pub async fn fetch_subjob_details(&self, subjob_id: &str) -> Result<JobResultsView> {
        let ticket = self.begin(subjob_id);

        let record = self
            .source
            .fetch_job(subjob_id)
            .await
            .map_err(|source| Error::root_fetch(subjob_id, source))?;

        let view = self.reconstruct(ChainWalk::single(record)).await;
        self.finish(ticket, subjob_id)?;
        Ok(view)
    }

    async fn reconstruct(&self, chain: ChainWalk) -> JobResultsView {
        let total_jobs = chain.ids.len();
        let mut job_steps: Vec<JobSteps> = Vec::with_capacity(total_jobs);
        let mut infos: Vec<ChainJobInfo> = Vec::with_capacity(total_jobs);
        let mut approvals: Vec<ApprovalRecord> = Vec::new();
        let mut seen_approvals: HashSet<String> = HashSet::new();
        let mut metadata: Map<String, Value> = Map::new();
        let mut quality_warnings: Vec<String> = Vec::new();
        let mut subjob_ids: Vec<String> = Vec::new();
        let mut seen_subjobs: HashSet<String> = HashSet::new();

        for (context_id, job_id) in chain.ids.iter().enumerate() {
            let record = chain.records.get(job_id);
            if context_id == 0 {
                if let Some(record) = record {
                    merge_metadata(&mut metadata, &record.metadata);
                }
            }

            let summary = match self.source.fetch_results_summary(job_id).await {
                Ok(summary) => summary,
                Err(err) => {
                    debug!(
                        job_id = %job_id,
                        error = %err,
                        "results summary unavailable, falling back to raw result"
                    );
                    None
                }
            };

            let source = match summary {
                Some(summary) => {
                    merge_metadata(&mut metadata, &summary.metadata);
                    extend_warnings(&mut quality_warnings, summary.quality_warnings);
                    for subjob in summary.subjobs {
                        if seen_subjobs.insert(subjob.clone()) {
                            subjob_ids.push(subjob);
                        }
                    }
                    for step in &summary.steps {
                        if let Some(output) = &step.output {
                            self.push_output(job_id, &step.step_name, output);
                        }
                    }
                    StepSource::Shaped(summary.steps)
                }
                None => {
                    let normalized = self.normalized_raw_result(job_id, record).await;
                    merge_metadata(&mut metadata, &normalized.metadata);
                    extend_warnings(&mut quality_warnings, normalized.quality_warnings);
                    for (step_name, value) in &normalized.step_results {
                        self.push_output(job_id, step_name, value);
                    }
                    StepSource::Raw(normalized.step_results)
                }
            };

            job_steps.push(JobSteps {
                job_id: job_id.clone(),
                source,
            });

            match self.source.fetch_approvals(job_id, None).await {
                Ok(records) => {
                    for approval in records {
                        if seen_approvals.insert(approval.id.clone()) {
                            approvals.push(approval);
                        }
                    }
                }
                Err(err) => {
                    warn!(job_id = %job_id, error = %err, "failed to fetch approvals, omitting them");
                }
            }

            infos.push(ChainJobInfo {
                job_id: job_id.clone(),
                context_id,
                is_root: context_id == 0,
                total_jobs,
                status: record.map(|r| r.status),
                created_at: record.and_then(|r| r.created_at),
                completed_at: record.and_then(|r| r.completed_at),
            });
        }

        for job_id in chain.ids.iter().skip(1) {
            if seen_subjobs.insert(job_id.clone()) {
                subjob_ids.push(job_id.clone());
            }
        }
        if let Some(root_id) = chain.root_id() {
            let root_id = root_id.to_owned();
            subjob_ids.retain(|id| *id != root_id);
        }

        let steps = aggregate_steps(job_steps);
        let timeline = compose_timeline(&steps, &approvals, &infos);
        let performance = PerformanceMetrics::from_steps(&steps);
        let contexts = infos
            .iter()
            .map(|info| ExecutionContext {
                id: info.context_id,
                job_id: info.job_id.clone(),
            })
            .collect();

        JobResultsView {
            root_job_id: chain.ids.first().cloned().unwrap_or_default(),
            metadata,
            steps,
            timeline,
            subjob_ids,
            performance,
            quality_warnings,
            contexts,
        }
    }

    /// Fallback for jobs without a results summary: normalize the record's
    /// embedded result, or fetch the result payload when the record carries
    /// none. Every failure degrades to zero steps for that job.
    async fn normalized_raw_result(
        &self,
        job_id: &str,
        record: Option<&JobRecord>,
    ) -> NormalizedResult {
        let raw = match record.and_then(|r| r.result.clone()) {
            Some(value) => Some(value),
            None => match self.source.fetch_job_result(job_id).await {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!(
                        job_id = %job_id,
                        error = %err,
                        "no result payload, job contributes zero steps"
                    );
                    None
                }
            },
        };

        raw.map(|raw| normalize_result(&raw)).unwrap_or_default()
    }

    fn push_output(&self, job_id: &str, step_name: &str, value: &Value) {
        let filename = value
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or(step_name);
        let key = format!("{job_id}_{filename}");
        self.sink.add(&key, value.clone());
    }

    fn begin(&self, target: &str) -> u64 {
        let mut latest = self.latest.lock();
        latest.generation += 1;
        latest.target = target.to_owned();
        latest.generation
    }

    /// A result is stale only when a newer request for a different target
    /// was issued meanwhile; re-requesting the same target keeps the
    /// earlier result valid.
    fn finish(&self, ticket: u64, target: &str) -> Result<()> {
        let latest = self.latest.lock();
        if latest.generation != ticket && latest.target != target {
            return Err(Error::Superseded);
        }
        Ok(())
    }
}

fn merge_metadata(into: &mut Map<String, Value>, from: &Map<String, Value>) {
    for (key, value) in from {
        into.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

fn extend_warnings(into: &mut Vec<String>, from: Vec<String>) {
    for warning in from {
        if !into.contains(&warning) {
            into.push(warning);
        }
    }
}
