//! Crate-wide error types.

use thiserror::Error;

use crate::source::SourceError;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a reconstruction.
///
/// Partial failures (a missing subjob, a result payload of unknown shape)
/// never appear here; the reconstructed view is simply truncated or missing
/// the affected steps.
#[derive(Error, Debug)]
pub enum Error {
    /// The root job of the chain could not be fetched. This is the only
    /// fetch failure that reaches the caller.
    #[error("failed to fetch root job {job_id}: {source}")]
    RootFetch {
        job_id: String,
        #[source]
        source: SourceError,
    },

    /// A newer reconstruction for a different target job was started while
    /// this one was in flight; this result is stale and was discarded.
    #[error("reconstruction superseded by a newer request")]
    Superseded,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn root_fetch(job_id: impl Into<String>, source: SourceError) -> Self {
        Self::RootFetch {
            job_id: job_id.into(),
            source,
        }
    }
}
