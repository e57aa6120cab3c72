//! ETH fiat rates with a short-lived cache
//!
//! A fresh cache entry is served as-is. When the upstream call fails and an
//! older entry exists, that entry is served marked `stale`.

use crate::error::TrackerResult;
use crate::history::types::iso_timestamp;
use crate::provider::{EthRates, RateProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesResponse {
    #[serde(flatten)]
    pub rates: EthRates,
    pub fetched_at: Option<String>,
    pub cached: bool,
    /// Seconds since the rates were fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedRates {
    rates: EthRates,
    fetched_at_ms: i64,
}

pub struct RateCache {
    provider: Arc<dyn RateProvider>,
    ttl_ms: i64,
    entry: Mutex<Option<CachedRates>>,
}

impl RateCache {
    pub fn new(provider: Arc<dyn RateProvider>, ttl_ms: u64) -> Self {
        Self {
            provider,
            ttl_ms: ttl_ms as i64,
            entry: Mutex::new(None),
        }
    }

    fn respond(entry: &CachedRates, cached: bool, now_ms: i64) -> RatesResponse {
        RatesResponse {
            rates: entry.rates.clone(),
            fetched_at: iso_timestamp(entry.fetched_at_ms),
            cached,
            cache_age: cached.then(|| ((now_ms - entry.fetched_at_ms) as f64 / 1000.0).round() as i64),
            stale: None,
            error: None,
        }
    }

    pub async fn get(&self, now_ms: i64) -> TrackerResult<RatesResponse> {
        if let Some(entry) = self.entry.lock().await.as_ref() {
            if now_ms - entry.fetched_at_ms < self.ttl_ms {
                return Ok(Self::respond(entry, true, now_ms));
            }
        }

        // The lock is not held across the upstream call.
        match self.provider.eth_rates().await {
            Ok(rates) => {
                let entry = CachedRates { rates, fetched_at_ms: now_ms };
                let response = Self::respond(&entry, false, now_ms);
                *self.entry.lock().await = Some(entry);
                log::debug!("💱 Refreshed ETH rates (usd {:.2})", response.rates.usd);
                Ok(response)
            }
            Err(e) => {
                let guard = self.entry.lock().await;
                match guard.as_ref() {
                    Some(entry) => {
                        log::warn!("⚠️  Rates refresh failed, serving stale: {}", e);
                        let mut response = Self::respond(entry, true, now_ms);
                        response.stale = Some(true);
                        response.error = Some(e.to_string());
                        Ok(response)
                    }
                    None => Err(e),
                }
            }
        }
    }
}
