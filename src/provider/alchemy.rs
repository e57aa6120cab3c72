//! Alchemy NFT API: floor price and collection supply
//!
//! Endpoints (v3):
//! - `GET {base}/nft/v3/{key}/getFloorPrice?contractAddress=...`
//! - `GET {base}/nft/v3/{key}/getContractMetadata?contractAddress=...`

use super::{ensure_success, FloorQuote, PriceProvider};
use crate::error::{TrackerError, TrackerResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketplaceFloor {
    floor_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloorPriceResponse {
    open_sea: Option<MarketplaceFloor>,
    looks_rare: Option<MarketplaceFloor>,
}

pub struct AlchemyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AlchemyClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn api_key(&self) -> TrackerResult<&str> {
        self.api_key.as_deref().ok_or_else(|| TrackerError::Configuration {
            message: "ALCHEMY_API_KEY not configured".to_string(),
            instructions: vec![
                "Create an app at dashboard.alchemy.com (Ethereum mainnet)".to_string(),
                "Set ALCHEMY_API_KEY in the environment or .env file".to_string(),
            ],
        })
    }

    async fn get_json(&self, method: &str, contract: &str) -> TrackerResult<Value> {
        let url = format!("{}/nft/v3/{}/{}", self.base_url, self.api_key()?, method);
        let response = self
            .http
            .get(&url)
            .query(&[("contractAddress", contract)])
            .send()
            .await?;
        let response = ensure_success(response, method).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| TrackerError::UpstreamUnavailable(format!("{} body: {}", method, e)))
    }
}

/// OpenSea floor first, LooksRare as fallback; zero when neither reports one.
fn pick_floor(resp: &FloorPriceResponse) -> FloorQuote {
    let positive = |m: &Option<MarketplaceFloor>| {
        m.as_ref().and_then(|f| f.floor_price).filter(|p| *p > 0.0)
    };

    if let Some(price) = positive(&resp.open_sea) {
        FloorQuote { price, source: "OpenSea".to_string() }
    } else if let Some(price) = positive(&resp.looks_rare) {
        FloorQuote { price, source: "LooksRare".to_string() }
    } else {
        FloorQuote { price: 0.0, source: "none".to_string() }
    }
}

/// `totalSupply` arrives as a decimal string, occasionally as a number.
fn parse_supply(meta: &Value) -> Option<u64> {
    match meta.get("totalSupply")? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[async_trait]
impl PriceProvider for AlchemyClient {
    async fn floor_price(&self, contract: &str) -> TrackerResult<FloorQuote> {
        let body = self.get_json("getFloorPrice", contract).await?;
        let resp: FloorPriceResponse = serde_json::from_value(body).map_err(|e| {
            TrackerError::UpstreamUnavailable(format!("unexpected getFloorPrice shape: {}", e))
        })?;
        Ok(pick_floor(&resp))
    }

    async fn total_supply(&self, contract: &str) -> TrackerResult<u64> {
        let meta = self.get_json("getContractMetadata", contract).await?;
        parse_supply(&meta).ok_or_else(|| {
            TrackerError::UpstreamUnavailable("contract metadata has no totalSupply".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn floor_response(v: Value) -> FloorPriceResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_prefers_opensea() {
        let quote = pick_floor(&floor_response(json!({
            "openSea": { "floorPrice": 0.021, "priceCurrency": "ETH" },
            "looksRare": { "floorPrice": 0.019 }
        })));
        assert_eq!(quote, FloorQuote { price: 0.021, source: "OpenSea".into() });
    }

    #[test]
    fn test_falls_back_to_looksrare() {
        let quote = pick_floor(&floor_response(json!({
            "openSea": { "floorPrice": 0 },
            "looksRare": { "floorPrice": 0.019 }
        })));
        assert_eq!(quote.source, "LooksRare");
        assert_eq!(quote.price, 0.019);

        let quote = pick_floor(&floor_response(json!({ "looksRare": { "floorPrice": 0.5 } })));
        assert_eq!(quote.source, "LooksRare");
    }

    #[test]
    fn test_no_floor_is_zero() {
        let quote = pick_floor(&floor_response(json!({
            "openSea": { "error": "unavailable" }
        })));
        assert_eq!(quote.price, 0.0);
        assert_eq!(quote.source, "none");
    }

    #[test]
    fn test_parse_supply() {
        assert_eq!(parse_supply(&json!({ "totalSupply": "56741" })), Some(56741));
        assert_eq!(parse_supply(&json!({ "totalSupply": 12 })), Some(12));
        assert_eq!(parse_supply(&json!({ "totalSupply": "n/a" })), None);
        assert_eq!(parse_supply(&json!({})), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let client = AlchemyClient::new(reqwest::Client::new(), "http://127.0.0.1:9", Some("  ".into()));
        let err = client.floor_price("0xabc").await.unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
        assert!(!err.instructions().is_empty());
    }
}
