//! # restitch-client
//!
//! HTTP binding of the `restitch-core` [`JobSource`] capability trait.
//! Talks to the job backend's REST endpoints and maps transport failures
//! onto [`SourceError`] so the reconstruction engine stays
//! transport-agnostic.

mod config;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use restitch_core::{
    ApprovalRecord, ApprovalStatus, JobRecord, JobSource, ResultsSummary, SourceError,
};

pub use config::{ClientConfig, DEFAULT_USER_AGENT};

/// Errors constructing a [`JobApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL `{input}`: {reason}")]
    InvalidBaseUrl { input: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// [`JobSource`] implementation over the job backend's REST API.
#[derive(Debug, Clone)]
pub struct JobApiClient {
    base_url: Url,
    client: Client,
}

impl JobApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| ClientError::InvalidBaseUrl {
            input: config.base_url.clone(),
            reason: err.to_string(),
        })?;
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self { base_url, client })
    }

    /// Wrap an existing client, e.g. one sharing a connection pool.
    pub fn with_client(base_url: Url, client: Client) -> Self {
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/api/jobs/{job_id}[/{tail}]`, percent-encoding each
    /// segment.
    fn job_endpoint(&self, job_id: &str, tail: Option<&str>) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                SourceError::unavailable("base URL cannot carry path segments")
            })?;
            segments.extend(["api", "jobs", job_id]);
            if let Some(tail) = tail {
                segments.push(tail);
            }
        }
        Ok(url)
    }

    async fn get_json(&self, url: Url, operation: &'static str) -> Result<Value, SourceError> {
        debug!(url = %url, operation, "job api request");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| SourceError::network(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::not_found(url.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                operation,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| SourceError::decode(err.to_string()))
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SourceError> {
        serde_json::from_value(value).map_err(|err| SourceError::decode(err.to_string()))
    }
}

#[async_trait]
impl JobSource for JobApiClient {
    async fn fetch_job(&self, job_id: &str) -> Result<JobRecord, SourceError> {
        let url = self.job_endpoint(job_id, None)?;
        let value = self.get_json(url, "fetch_job").await?;
        Self::decode(value)
    }

    async fn fetch_job_result(&self, job_id: &str) -> Result<Value, SourceError> {
        let url = self.job_endpoint(job_id, Some("result"))?;
        self.get_json(url, "fetch_job_result").await
    }

    async fn fetch_results_summary(
        &self,
        job_id: &str,
    ) -> Result<Option<ResultsSummary>, SourceError> {
        let url = self.job_endpoint(job_id, Some("results-summary"))?;
        match self.get_json(url, "fetch_results_summary").await {
            Ok(value) => Ok(Some(Self::decode(value)?)),
            // Not every job has a summary; that is not an error.
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn fetch_approvals(
        &self,
        job_id: &str,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<ApprovalRecord>, SourceError> {
        let mut url = self.job_endpoint(job_id, Some("approvals"))?;
        if let Some(status) = status {
            url.query_pairs_mut().append_pair("status", status.as_str());
        }
        let value = self.get_json(url, "fetch_approvals").await?;

        // Endpoint vintage: either a bare array or `{"approvals": [...]}`.
        let records = match value {
            Value::Array(_) => value,
            other => other.get("approvals").cloned().unwrap_or(Value::Array(Vec::new())),
        };
        Self::decode(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> JobApiClient {
        JobApiClient::new(ClientConfig::new("http://backend.test:9000")).unwrap()
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            JobApiClient::new(ClientConfig::new("not a url")),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_job_endpoint_layout() {
        let client = client();
        assert_eq!(
            client.job_endpoint("job-1", None).unwrap().as_str(),
            "http://backend.test:9000/api/jobs/job-1"
        );
        assert_eq!(
            client
                .job_endpoint("job-1", Some("results-summary"))
                .unwrap()
                .as_str(),
            "http://backend.test:9000/api/jobs/job-1/results-summary"
        );
    }

    #[test]
    fn test_job_endpoint_encodes_segments() {
        let client = client();
        let url = client.job_endpoint("job/../1", None).unwrap();
        assert_eq!(
            url.as_str(),
            "http://backend.test:9000/api/jobs/job%2F..%2F1"
        );
    }

    #[test]
    fn test_approval_status_query_value() {
        let client = client();
        let mut url = client.job_endpoint("j", Some("approvals")).unwrap();
        url.query_pairs_mut()
            .append_pair("status", ApprovalStatus::Pending.as_str());
        assert_eq!(
            url.as_str(),
            "http://backend.test:9000/api/jobs/j/approvals?status=pending"
        );
    }
}
