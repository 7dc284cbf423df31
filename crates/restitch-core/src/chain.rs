//! Chain discovery: enumerating every job record that belongs to one
//! logical pipeline run.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::models::JobRecord;
use crate::source::{JobSource, SourceError};

/// Result of walking a job chain.
#[derive(Debug, Clone, Default)]
pub struct ChainWalk {
    /// Every discovered job id, root first.
    pub ids: Vec<String>,
    /// Records fetched along the way, kept to spare refetches downstream.
    pub records: HashMap<String, JobRecord>,
}

impl ChainWalk {
    /// A chain consisting of a single, already-fetched job.
    pub fn single(record: JobRecord) -> Self {
        let mut records = HashMap::new();
        let id = record.id.clone();
        records.insert(id.clone(), record);
        Self {
            ids: vec![id],
            records,
        }
    }

    pub fn root_id(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }
}

/// Walk the chain containing `start_id`, following `original_job_id`
/// pointers back to the root and `resume_job_id` pointers forward to the
/// newest job. Returns ids in chain order, root first.
///
/// Pointer data is externally supplied and not provably acyclic, so every
/// visited id goes into a guard set; revisiting one stops the walk. A
/// failed fetch for any job other than the starting one truncates the walk
/// instead of erroring.
pub async fn walk_chain<S: JobSource + ?Sized>(
    source: &S,
    start_id: &str,
) -> Result<ChainWalk, SourceError> {
    let start = source.fetch_job(start_id).await?;
    Ok(walk_from(source, start).await)
}

/// Same as [`walk_chain`], starting from an already-fetched record.
pub async fn walk_from<S: JobSource + ?Sized>(source: &S, start: JobRecord) -> ChainWalk {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(start.id.clone());

    let mut records = HashMap::new();
    records.insert(start.id.clone(), start.clone());

    // Backward to the root.
    let mut behind: Vec<String> = Vec::new();
    let mut cursor = start.clone();
    loop {
        let Some(prev_id) = cursor.original_pointer().map(str::to_owned) else {
            break;
        };
        if !visited.insert(prev_id.clone()) {
            warn!(job_id = %prev_id, "pointer cycle while walking back, stopping");
            break;
        }
        match source.fetch_job(&prev_id).await {
            Ok(job) => {
                behind.push(job.id.clone());
                records.insert(job.id.clone(), job.clone());
                cursor = job;
            }
            Err(err) => {
                warn!(job_id = %prev_id, error = %err, "chain truncated: prior job fetch failed");
                break;
            }
        }
    }

    let mut ids: Vec<String> = behind.into_iter().rev().collect();
    ids.push(start.id.clone());

    // Forward to the newest job.
    let mut cursor = start;
    loop {
        let Some(next_id) = cursor.resume_pointer().map(str::to_owned) else {
            break;
        };
        if !visited.insert(next_id.clone()) {
            warn!(job_id = %next_id, "pointer cycle while walking forward, stopping");
            break;
        }
        match source.fetch_job(&next_id).await {
            Ok(job) => {
                ids.push(job.id.clone());
                records.insert(job.id.clone(), job.clone());
                cursor = job;
            }
            Err(err) => {
                warn!(job_id = %next_id, error = %err, "chain truncated: resume job fetch failed");
                break;
            }
        }
    }

    ChainWalk { ids, records }
}
