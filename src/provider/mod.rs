//! Upstream data providers
//!
//! Narrow traits over the HTTP APIs the tracker consumes, so ingestion,
//! backfill and rates can be driven by fakes in tests.
//!
//! - `PriceProvider` - floor price and supply (Alchemy NFT API)
//! - `QueryProvider` - long-running analytical queries (Dune)
//! - `RateProvider` - ETH fiat rates (CoinGecko)

pub mod alchemy;
pub mod coingecko;
pub mod dune;

pub use alchemy::AlchemyClient;
pub use coingecko::CoinGeckoClient;
pub use dune::DuneClient;

use crate::error::{TrackerError, TrackerResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Floor price plus the marketplace it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorQuote {
    pub price: f64,
    pub source: String,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn floor_price(&self, contract: &str) -> TrackerResult<FloorQuote>;
    async fn total_supply(&self, contract: &str) -> TrackerResult<u64>;
}

/// State of an analytical query execution.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPoll {
    Pending(String),
    Completed(Vec<serde_json::Value>),
    Failed(String),
}

#[async_trait]
pub trait QueryProvider: Send + Sync {
    /// Start a saved query; returns the execution id.
    async fn execute(&self, query_id: &str) -> TrackerResult<String>;
    async fn poll_result(&self, execution_id: &str) -> TrackerResult<QueryPoll>;
}

/// Price of one ETH in several currencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EthRates {
    pub usd: f64,
    pub gbp: f64,
    pub eur: f64,
    pub btc: f64,
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn eth_rates(&self) -> TrackerResult<EthRates>;
}

/// Shared reqwest client with a request timeout.
pub fn http_client(timeout_ms: u64) -> TrackerResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| TrackerError::config(format!("failed to build HTTP client: {}", e)))
}

/// Turn a non-2xx response into `UpstreamUnavailable`, keeping the body for context.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> TrackerResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TrackerError::UpstreamUnavailable(format!(
        "{} returned {}: {}",
        what,
        status,
        body.chars().take(200).collect::<String>()
    )))
}
