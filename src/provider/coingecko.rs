//! CoinGecko simple price endpoint for ETH fiat rates

use super::{ensure_success, EthRates, RateProvider};
use crate::error::{TrackerError, TrackerResult};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    ethereum: Option<PartialRates>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialRates {
    usd: Option<f64>,
    gbp: Option<f64>,
    eur: Option<f64>,
    btc: Option<f64>,
}

impl From<PartialRates> for EthRates {
    fn from(p: PartialRates) -> Self {
        EthRates {
            usd: p.usd.unwrap_or(0.0),
            gbp: p.gbp.unwrap_or(0.0),
            eur: p.eur.unwrap_or(0.0),
            btc: p.btc.unwrap_or(0.0),
        }
    }
}

pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RateProvider for CoinGeckoClient {
    async fn eth_rates(&self) -> TrackerResult<EthRates> {
        let url = format!("{}/api/v3/simple/price", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("ids", "ethereum"), ("vs_currencies", "usd,gbp,eur,btc")])
            .send()
            .await?;
        let response = ensure_success(response, "CoinGecko").await?;

        let body: SimplePriceResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::UpstreamUnavailable(format!("CoinGecko body: {}", e)))?;

        Ok(body.ethereum.unwrap_or_default().into())
    }
}
