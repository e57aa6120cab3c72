//! Integration tests for the HTTP router
//!
//! Requests go through `tower::ServiceExt::oneshot` against the full router,
//! with fake providers behind `AppState::with_providers`.

#[cfg(test)]
mod api_tests {
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use floorcap::api::{self, AppState};
    use floorcap::config::AppConfig;
    use floorcap::history::types::now_ms;
    use floorcap::history::windows::HOUR_MS;
    use floorcap::history::Observation;
    use floorcap::provider::{AlchemyClient, EthRates, FloorQuote, PriceProvider, RateProvider};
    use floorcap::store::{MemorySampleStore, SampleStore};
    use floorcap::{TrackerError, TrackerResult};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct FakeFloor {
        price: f64,
    }

    #[async_trait]
    impl PriceProvider for FakeFloor {
        async fn floor_price(&self, _contract: &str) -> TrackerResult<FloorQuote> {
            Ok(FloorQuote { price: self.price, source: "OpenSea".to_string() })
        }

        async fn total_supply(&self, _contract: &str) -> TrackerResult<u64> {
            Ok(56_741)
        }
    }

    struct FakeRates;

    #[async_trait]
    impl RateProvider for FakeRates {
        async fn eth_rates(&self) -> TrackerResult<EthRates> {
            Ok(EthRates { usd: 3_000.0, gbp: 2_400.0, eur: 2_800.0, btc: 0.05 })
        }
    }

    struct DownRates;

    #[async_trait]
    impl RateProvider for DownRates {
        async fn eth_rates(&self) -> TrackerResult<EthRates> {
            Err(TrackerError::UpstreamUnavailable("CoinGecko returned 429".to_string()))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SampleStore for BrokenStore {
        async fn append(&self, _score: i64, _member: String) -> TrackerResult<()> {
            Err(TrackerError::Store("disk I/O error".to_string()))
        }

        async fn append_batch(&self, _entries: Vec<(i64, String)>) -> TrackerResult<usize> {
            Err(TrackerError::Store("disk I/O error".to_string()))
        }

        async fn range_all(&self) -> TrackerResult<Vec<String>> {
            Err(TrackerError::Store("disk I/O error".to_string()))
        }

        async fn range_since(&self, _min_score: i64) -> TrackerResult<Vec<String>> {
            Err(TrackerError::Store("disk I/O error".to_string()))
        }

        async fn prune_older_than(&self, _cutoff: i64) -> TrackerResult<usize> {
            Err(TrackerError::Store("disk I/O error".to_string()))
        }

        async fn len(&self) -> TrackerResult<usize> {
            Err(TrackerError::Store("disk I/O error".to_string()))
        }
    }

    fn test_config() -> AppConfig {
        AppConfig::from_lookup(|_| None).unwrap()
    }

    fn app_with(
        store: Arc<dyn SampleStore>,
        price: Arc<dyn PriceProvider>,
        rates: Arc<dyn RateProvider>,
    ) -> Router {
        let state = AppState::with_providers(test_config(), store, price, rates, None, reqwest::Client::new());
        api::router(state)
    }

    fn app(store: Arc<MemorySampleStore>) -> Router {
        app_with(store, Arc::new(FakeFloor { price: 0.02 }), Arc::new(FakeRates))
    }

    async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(Arc::new(MemorySampleStore::new())), Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["samples"], 0);
    }

    #[tokio::test]
    async fn test_history_empty_store_is_ok() {
        let (status, body) = send(app(Arc::new(MemorySampleStore::new())), Method::GET, "/api/history").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["series"].as_array().unwrap().len(), 0);
        assert!(body["current"].is_null());
        assert!(body["message"].as_str().unwrap().contains("no data"));
        for window in ["hour", "day", "week", "month", "quarter"] {
            assert!(body["changes"][window].is_null(), "{} should be null", window);
        }
    }

    #[tokio::test]
    async fn test_history_store_fault_is_degraded_ok() {
        let app = app_with(Arc::new(BrokenStore), Arc::new(FakeFloor { price: 0.02 }), Arc::new(FakeRates));

        let (status, body) = send(app, Method::GET, "/api/history").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["series"].as_array().unwrap().len(), 0);
        assert!(body["current"].is_null());
        assert!(body["error"].as_str().unwrap().contains("disk I/O error"));
        for window in ["hour", "day", "week", "month", "quarter"] {
            assert!(body["changes"][window].is_null(), "{} should be null", window);
        }
    }

    #[tokio::test]
    async fn test_history_reports_changes() {
        let store = Arc::new(MemorySampleStore::new());
        let now = now_ms();
        for k in 1..=8 {
            let obs = Observation::new(1.0, 56_741, now - k * 6 * HOUR_MS);
            store.append(obs.timestamp, obs.to_member().unwrap()).await.unwrap();
        }
        let latest = Observation::new(1.5, 56_741, now - 60_000);
        store.append(latest.timestamp, latest.to_member().unwrap()).await.unwrap();

        let (status, body) = send(app(store), Method::GET, "/api/history").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dataPoints"], 9);
        assert_eq!(body["current"]["floorPrice"], 1.5);
        assert_eq!(body["changes"]["day"].as_f64(), Some(50.0));
        assert!(body["changes"]["quarter"].is_null());
        assert_eq!(body["diagnostics"]["removedOutliers"], 0);
        assert!(body["diagnostics"]["newest"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_floor_snapshot() {
        let (status, body) = send(app(Arc::new(MemorySampleStore::new())), Method::GET, "/api/floor").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["floorPrice"], 0.02);
        assert_eq!(body["totalSupply"], 56_741);
        assert_eq!(body["source"], "OpenSea");
        assert!((body["marketCap"].as_f64().unwrap() - 1_134.82).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_floor_without_key_is_configuration_error() {
        let alchemy = Arc::new(AlchemyClient::new(reqwest::Client::new(), "http://127.0.0.1:9", None));
        let app = app_with(Arc::new(MemorySampleStore::new()), alchemy, Arc::new(FakeRates));

        let (status, body) = send(app, Method::GET, "/api/floor").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "configuration_error");
        assert!(!body["instructions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_get_and_post() {
        let store = Arc::new(MemorySampleStore::new());

        let (status, body) = send(app(store.clone()), Method::POST, "/api/ingest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["floorPrice"], 0.02);

        let (status, _) = send(app(store.clone()), Method::GET, "/api/ingest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_zero_floor_is_rejected() {
        let store = Arc::new(MemorySampleStore::new());
        let app = app_with(store.clone(), Arc::new(FakeFloor { price: 0.0 }), Arc::new(FakeRates));

        let (status, body) = send(app, Method::POST, "/api/ingest").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "invalid_observation");
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_backfill_requires_key_and_query() {
        let store = Arc::new(MemorySampleStore::new());

        let (status, body) = send(app(store.clone()), Method::GET, "/api/backfill?query_id=1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "configuration_error");
        assert!(body["instructions"].as_array().unwrap().len() > 3);

        let (status, body) = send(app(store), Method::GET, "/api/backfill?dune_key=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
    }

    #[tokio::test]
    async fn test_rates() {
        let (status, body) = send(app(Arc::new(MemorySampleStore::new())), Method::GET, "/api/rates").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usd"], 3_000.0);
        assert_eq!(body["cached"], false);

        let app = app_with(Arc::new(MemorySampleStore::new()), Arc::new(FakeFloor { price: 0.02 }), Arc::new(DownRates));
        let (status, body) = send(app, Method::GET, "/api/rates").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "upstream_unavailable");
    }
}
