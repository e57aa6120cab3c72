//! Dune analytical query API, used by backfill
//!
//! - `POST {base}/api/v1/query/{query_id}/execute` → `{ "execution_id": ... }`
//! - `GET  {base}/api/v1/execution/{execution_id}/results` → `{ "state": ..., "result": { "rows": [...] } }`

use super::{ensure_success, QueryPoll, QueryProvider};
use crate::error::{TrackerError, TrackerResult};
use async_trait::async_trait;
use serde::Deserialize;

const API_KEY_HEADER: &str = "X-Dune-API-Key";

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    execution_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultRows {
    #[serde(default)]
    rows: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    state: Option<String>,
    result: Option<ResultRows>,
    error: Option<serde_json::Value>,
}

pub struct DuneClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DuneClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

fn classify(resp: ResultsResponse) -> QueryPoll {
    let state = resp.state.unwrap_or_else(|| "UNKNOWN".to_string());
    match state.as_str() {
        "QUERY_STATE_COMPLETED" => QueryPoll::Completed(resp.result.map(|r| r.rows).unwrap_or_default()),
        "QUERY_STATE_FAILED" | "QUERY_STATE_CANCELLED" | "QUERY_STATE_EXPIRED" => {
            let reason = match resp.error {
                Some(serde_json::Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => format!("Unknown error ({})", state),
            };
            QueryPoll::Failed(reason)
        }
        _ => QueryPoll::Pending(state),
    }
}

#[async_trait]
impl QueryProvider for DuneClient {
    async fn execute(&self, query_id: &str) -> TrackerResult<String> {
        let url = format!("{}/api/v1/query/{}/execute", self.base_url, query_id);
        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let response = ensure_success(response, "Dune execute").await?;

        let body: ExecuteResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::UpstreamUnavailable(format!("Dune execute body: {}", e)))?;

        body.execution_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TrackerError::UpstreamFailed("No execution ID returned from Dune".to_string()))
    }

    async fn poll_result(&self, execution_id: &str) -> TrackerResult<QueryPoll> {
        let url = format!("{}/api/v1/execution/{}/results", self.base_url, execution_id);
        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let response = ensure_success(response, "Dune results").await?;

        let body: ResultsResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::UpstreamUnavailable(format!("Dune results body: {}", e)))?;

        Ok(classify(body))
    }
}
