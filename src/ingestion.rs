//! Ingestion: one floor-price sample per invocation
//!
//! Fetch price and supply, derive market cap, append to the sample store,
//! then prune anything older than the retention horizon. The prune is
//! best-effort and never fails the ingestion.

use crate::error::{TrackerError, TrackerResult};
use crate::history::types::Observation;
use crate::history::windows::DAY_MS;
use crate::provider::PriceProvider;
use crate::store::SampleStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Live quote returned by the current-price read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorSnapshot {
    pub floor_price: f64,
    pub total_supply: u64,
    pub market_cap: f64,
    pub timestamp: i64,
    pub source: String,
}

impl FloorSnapshot {
    pub fn to_observation(&self) -> Observation {
        Observation::new(self.floor_price, self.total_supply, self.timestamp)
    }
}

pub struct Ingestor {
    provider: Arc<dyn PriceProvider>,
    store: Arc<dyn SampleStore>,
    contract: String,
    retention_ms: i64,
}

impl Ingestor {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        store: Arc<dyn SampleStore>,
        contract: impl Into<String>,
        retention_days: u32,
    ) -> Self {
        Self {
            provider,
            store,
            contract: contract.into(),
            retention_ms: retention_days as i64 * DAY_MS,
        }
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Fetch floor price and supply concurrently. Nothing is written.
    pub async fn fetch_snapshot(&self, now_ms: i64) -> TrackerResult<FloorSnapshot> {
        let (quote, supply) = tokio::join!(
            self.provider.floor_price(&self.contract),
            self.provider.total_supply(&self.contract)
        );
        let quote = quote?;
        let total_supply = supply?;

        Ok(FloorSnapshot {
            floor_price: quote.price,
            total_supply,
            market_cap: quote.price * total_supply as f64,
            timestamp: now_ms,
            source: quote.source,
        })
    }

    /// Record one observation stamped `now_ms`.
    ///
    /// A non-positive price or zero supply is rejected before anything is
    /// appended.
    pub async fn ingest_one(&self, now_ms: i64) -> TrackerResult<Observation> {
        let snapshot = self.fetch_snapshot(now_ms).await?;

        if !(snapshot.floor_price > 0.0) || !snapshot.floor_price.is_finite() {
            return Err(TrackerError::InvalidObservation(format!(
                "floor price {} from {} is not positive",
                snapshot.floor_price, snapshot.source
            )));
        }
        if snapshot.total_supply == 0 {
            return Err(TrackerError::InvalidObservation(
                "total supply is zero".to_string(),
            ));
        }

        let observation = snapshot.to_observation();
        let member = observation.to_member()?;
        self.store.append(observation.timestamp, member).await?;

        log::info!(
            "📈 Ingested floor {:.4} ETH × {} = {:.2} ETH ({})",
            observation.floor_price,
            observation.total_supply,
            observation.market_cap,
            snapshot.source
        );

        self.prune(now_ms).await;
        Ok(observation)
    }

    async fn prune(&self, now_ms: i64) {
        if self.retention_ms <= 0 {
            return;
        }
        let cutoff = now_ms.saturating_sub(self.retention_ms);
        match self.store.prune_older_than(cutoff).await {
            Ok(0) => {}
            Ok(removed) => log::debug!("🧹 Pruned {} samples older than {}", removed, cutoff),
            Err(e) => log::warn!("⚠️  Prune failed (sample kept): {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FloorQuote;
    use crate::store::MemorySampleStore;
    use async_trait::async_trait;

    struct FixedProvider {
        price: TrackerResult<f64>,
        supply: u64,
    }

    #[async_trait]
    impl PriceProvider for FixedProvider {
        async fn floor_price(&self, _contract: &str) -> TrackerResult<FloorQuote> {
            match &self.price {
                Ok(p) => Ok(FloorQuote { price: *p, source: "OpenSea".into() }),
                Err(e) => Err(TrackerError::UpstreamUnavailable(e.to_string())),
            }
        }

        async fn total_supply(&self, _contract: &str) -> TrackerResult<u64> {
            Ok(self.supply)
        }
    }

    fn ingestor(price: TrackerResult<f64>, store: Arc<MemorySampleStore>) -> Ingestor {
        Ingestor::new(
            Arc::new(FixedProvider { price, supply: 100 }),
            store,
            "0xabc",
            365,
        )
    }

    #[tokio::test]
    async fn test_ingest_appends_observation() {
        let store = Arc::new(MemorySampleStore::new());
        let obs = ingestor(Ok(0.5), store.clone()).ingest_one(1_000).await.unwrap();

        assert_eq!(obs.market_cap, 50.0);
        assert_eq!(obs.timestamp, 1_000);

        let members = store.range_all().await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(Observation::from_member(&members[0]).unwrap(), obs);
    }

    #[tokio::test]
    async fn test_upstream_failure_appends_nothing() {
        let store = Arc::new(MemorySampleStore::new());
        let err = ingestor(Err(TrackerError::UpstreamUnavailable("503".into())), store.clone())
            .ingest_one(1_000)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "upstream_unavailable");
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_price_rejected() {
        let store = Arc::new(MemorySampleStore::new());
        let err = ingestor(Ok(0.0), store.clone()).ingest_one(1_000).await.unwrap_err();

        assert_eq!(err.kind(), "invalid_observation");
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prunes_beyond_retention() {
        let store = Arc::new(MemorySampleStore::new());
        let now = 400 * DAY_MS;
        let stale = Observation::new(0.4, 100, now - 366 * DAY_MS);
        let recent = Observation::new(0.4, 100, now - 10 * DAY_MS);
        store.append(stale.timestamp, stale.to_member().unwrap()).await.unwrap();
        store.append(recent.timestamp, recent.to_member().unwrap()).await.unwrap();

        ingestor(Ok(0.5), store.clone()).ingest_one(now).await.unwrap();

        let remaining: Vec<i64> = store
            .range_all()
            .await
            .unwrap()
            .iter()
            .map(|m| Observation::from_member(m).unwrap().timestamp)
            .collect();
        assert_eq!(remaining.len(), 2);
        assert!(!remaining.contains(&stale.timestamp));
    }

    /// Memory store whose prune always fails.
    struct UnprunableStore(MemorySampleStore);

    #[async_trait]
    impl SampleStore for UnprunableStore {
        async fn append(&self, score: i64, member: String) -> TrackerResult<()> {
            self.0.append(score, member).await
        }

        async fn append_batch(&self, entries: Vec<(i64, String)>) -> TrackerResult<usize> {
            self.0.append_batch(entries).await
        }

        async fn range_all(&self) -> TrackerResult<Vec<String>> {
            self.0.range_all().await
        }

        async fn range_since(&self, min_score: i64) -> TrackerResult<Vec<String>> {
            self.0.range_since(min_score).await
        }

        async fn prune_older_than(&self, _cutoff: i64) -> TrackerResult<usize> {
            Err(TrackerError::Store("database is locked".into()))
        }

        async fn len(&self) -> TrackerResult<usize> {
            self.0.len().await
        }
    }

    #[tokio::test]
    async fn test_prune_failure_keeps_sample() {
        let store = Arc::new(UnprunableStore(MemorySampleStore::new()));
        let ingestor = Ingestor::new(
            Arc::new(FixedProvider { price: Ok(0.5), supply: 100 }),
            store.clone(),
            "0xabc",
            365,
        );

        let obs = ingestor.ingest_one(400 * DAY_MS).await.unwrap();

        assert_eq!(obs.timestamp, 400 * DAY_MS);
        assert_eq!(store.len().await.unwrap(), 1);
    }
}
