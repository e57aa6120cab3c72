//! In-process ingestion ticker
//!
//! Optional. Deployments that drive ingestion from cron use the
//! `floorcap-ingest` binary instead and leave `INGEST_INTERVAL_MS` at 0.

use crate::history::types::now_ms;
use crate::ingestion::Ingestor;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Run `ingest_one` every `interval_ms` until the task is aborted.
///
/// Failures are logged and the ticker keeps going; the next tick is the retry.
pub async fn ingestion_scheduler_task(ingestor: Arc<Ingestor>, interval_ms: u64) {
    log::info!("⏰ Starting ingestion scheduler (interval: {}ms)", interval_ms);

    let mut timer = interval(Duration::from_millis(interval_ms.max(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut consecutive_failures: u32 = 0;
    loop {
        timer.tick().await;

        match ingestor.ingest_one(now_ms()).await {
            Ok(_) => {
                if consecutive_failures > 0 {
                    log::info!("✅ Ingestion recovered after {} failures", consecutive_failures);
                }
                consecutive_failures = 0;
            }
            Err(e) => {
                consecutive_failures += 1;
                log::error!("❌ Scheduled ingestion failed ({} in a row): {}", consecutive_failures, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerResult;
    use crate::provider::{FloorQuote, PriceProvider};
    use crate::store::{MemorySampleStore, SampleStore};
    use async_trait::async_trait;

    struct SteadyProvider;

    #[async_trait]
    impl PriceProvider for SteadyProvider {
        async fn floor_price(&self, _contract: &str) -> TrackerResult<FloorQuote> {
            Ok(FloorQuote { price: 0.02, source: "OpenSea".into() })
        }

        async fn total_supply(&self, _contract: &str) -> TrackerResult<u64> {
            Ok(10)
        }
    }

    #[tokio::test]
    async fn test_scheduler_ingests_on_each_tick() {
        let store = Arc::new(MemorySampleStore::new());
        let ingestor = Arc::new(Ingestor::new(Arc::new(SteadyProvider), store.clone(), "0xabc", 365));

        let handle = tokio::spawn(ingestion_scheduler_task(ingestor, 10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(store.len().await.unwrap() >= 2);
    }
}
