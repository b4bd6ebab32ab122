//! Upstream transport.
//!
//! # Responsibilities
//! - Define the `ApiClient` seam the fetcher talks to
//! - Provide the reqwest-backed implementation used in production
//!
//! # Design Decisions
//! - Only the status and the decoded JSON body cross the seam
//! - A non-200 body is never decoded; the status alone decides the error
//! - No retries and no client-side timeout: the pipeline deadline governs

use async_trait::async_trait;
use serde_json::Value;

use crate::pipeline::{PipelineError, PipelineResult};
use crate::upstream::query::ApiQuery;

/// One upstream answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Decoded JSON body; `Null` for non-200 answers.
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

/// Performs content API calls.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get(&self, url: &str, query: &ApiQuery) -> PipelineResult<ApiResponse>;
}

/// `ApiClient` over a shared reqwest connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    client: reqwest::Client,
}

impl ReqwestApiClient {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ApiClient for ReqwestApiClient {
    async fn get(&self, url: &str, query: &ApiQuery) -> PipelineResult<ApiResponse> {
        let params: Vec<(&str, &str)> = query.iter().collect();

        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamError(format!("request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Ok(ApiResponse {
                status,
                body: Value::Null,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::UpstreamError(format!("reading response from {url} failed: {e}")))?;
        let body = serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::MalformedPayload(format!("response is not JSON: {e}")))?;

        Ok(ApiResponse { status, body })
    }
}
