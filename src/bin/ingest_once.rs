//! One-shot ingestion for cron-style schedulers
//!
//! Records a single floor-price observation and exits non-zero on failure,
//! so the scheduler decides the retry cadence.
//!
//! Usage:
//!   cargo run --release --bin floorcap-ingest

use dotenv::dotenv;
use env_logger::Env;
use floorcap::config::AppConfig;
use floorcap::history::types::now_ms;
use floorcap::ingestion::Ingestor;
use floorcap::provider::{http_client, AlchemyClient};
use floorcap::store::{open_store, SampleStore};
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Ingestion failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> floorcap::TrackerResult<()> {
    let config = AppConfig::from_env()?;
    let store = open_store(&config.db_path)?;
    let http = http_client(config.http_timeout_ms)?;
    let provider = Arc::new(AlchemyClient::new(
        http,
        config.alchemy_base_url.clone(),
        config.alchemy_api_key.clone(),
    ));

    let ingestor = Ingestor::new(provider, store.clone(), config.contract.clone(), config.retention_days);
    let observation = ingestor.ingest_one(now_ms()).await?;

    info!(
        "✅ Stored observation at {} ({} samples total)",
        observation.timestamp,
        store.len().await?
    );
    Ok(())
}
