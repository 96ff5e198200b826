//! Embedding status API client
//!
//! Queries `GET {base}/embed/embeddings/{job_id}?user_id={user}`, which
//! answers `{"total_chunks": n}`. A positive count in a 2xx response means
//! the job's embeddings are materialized.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const USER_AGENT: &str = concat!("lumen-study/", env!("CARGO_PKG_VERSION"));

/// Status client errors
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Status endpoint response body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingStatusResponse {
    #[serde(default)]
    pub total_chunks: i64,
}

/// Anything that can report how many chunks a job has materialized
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn total_chunks(&self, job_id: &str) -> Result<i64, StatusError>;
}

/// HTTP client for the embedding service status endpoint
pub struct EmbeddingStatusClient {
    http_client: reqwest::Client,
    base_url: Url,
    user_id: String,
}

impl EmbeddingStatusClient {
    pub fn new(
        base_url: &str,
        user_id: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, StatusError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StatusError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StatusError::InvalidUrl(base_url.to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| StatusError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            user_id: user_id.into(),
        })
    }

    /// Full status URL for a job, query string included
    pub fn status_url(&self, job_id: &str) -> Result<Url, StatusError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StatusError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["embed", "embeddings", job_id]);
        url.query_pairs_mut().append_pair("user_id", &self.user_id);
        Ok(url)
    }

    /// Fetch the raw status response for a job
    pub async fn fetch(&self, job_id: &str) -> Result<EmbeddingStatusResponse, StatusError> {
        let url = self.status_url(job_id)?;

        tracing::debug!(job_id, "Querying embedding status");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| StatusError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StatusError::ApiError(status.as_u16(), error_text));
        }

        response
            .json::<EmbeddingStatusResponse>()
            .await
            .map_err(|e| StatusError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl StatusSource for EmbeddingStatusClient {
    async fn total_chunks(&self, job_id: &str) -> Result<i64, StatusError> {
        Ok(self.fetch(job_id).await?.total_chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> EmbeddingStatusClient {
        EmbeddingStatusClient::new(base, "user-1", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_status_url_layout() {
        let url = client("http://localhost:8000").status_url("doc-42").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/embed/embeddings/doc-42?user_id=user-1"
        );
    }

    #[test]
    fn test_status_url_keeps_base_path() {
        let url = client("https://api.example.com/v1/").status_url("doc").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/embed/embeddings/doc?user_id=user-1"
        );
    }

    #[test]
    fn test_status_url_escapes_job_id() {
        let url = client("http://localhost:8000").status_url("a/b c").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/embed/embeddings/a%2Fb%20c?user_id=user-1"
        );
    }

    #[test]
    fn test_rejects_unparseable_base_url() {
        let result = EmbeddingStatusClient::new("not a url", "u", Duration::from_secs(1));
        assert!(matches!(result, Err(StatusError::InvalidUrl(_))));

        let result =
            EmbeddingStatusClient::new("mailto:someone@example.com", "u", Duration::from_secs(1));
        assert!(matches!(result, Err(StatusError::InvalidUrl(_))));
    }

    #[test]
    fn test_missing_total_chunks_defaults_to_zero() {
        let response: EmbeddingStatusResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.total_chunks, 0);
    }
}
