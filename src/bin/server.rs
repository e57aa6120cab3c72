//! floorcap HTTP server
//!
//! Serves the current floor, the filtered history, backfill, ingestion and
//! rates endpoints. With `INGEST_INTERVAL_MS > 0` it also samples the floor
//! in-process.
//!
//! Usage:
//!   cargo run --release --bin floorcap-server
//!
//! Environment variables:
//!   FLOORCAP_DB_PATH - SQLite path or `:memory:` (default: data/floorcap.db)
//!   FLOORCAP_BIND - listen address (default: 0.0.0.0:8080)
//!   ALCHEMY_API_KEY - floor price / supply provider credential
//!   INGEST_INTERVAL_MS - in-process ingestion cadence, 0 disables (default: 0)

use dotenv::dotenv;
use env_logger::Env;
use floorcap::api::{self, AppState};
use floorcap::config::AppConfig;
use floorcap::scheduler::ingestion_scheduler_task;
use floorcap::store::open_store;
use log::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("🚀 floorcap server v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env()?;
    info!("   ├─ Contract: {}", config.contract);
    info!("   ├─ Database: {}", config.db_path);
    info!(
        "   ├─ Windows: {}",
        config.windows.iter().map(|w| w.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    info!(
        "   ├─ Outlier: p{:.0} ×{} / median ×{} ({})",
        config.outlier.percentile * 100.0,
        config.outlier.percentile_multiplier,
        config.outlier.median_multiplier,
        config.outlier.combine.as_str()
    );
    info!("   └─ Retention: {} days", config.retention_days);

    if config.alchemy_api_key.is_none() {
        warn!("⚠️  ALCHEMY_API_KEY not set: /api/floor and /api/ingest will report a configuration error");
    }

    let store = open_store(&config.db_path)?;
    let bind_addr = config.bind_addr.clone();
    let ingest_interval_ms = config.ingest_interval_ms;
    let state = AppState::new(config, store)?;

    let scheduler = if ingest_interval_ms > 0 {
        Some(tokio::spawn(ingestion_scheduler_task(state.ingestor.clone(), ingest_interval_ms)))
    } else {
        info!("⏸️  In-process ingestion disabled (INGEST_INTERVAL_MS=0)");
        None
    };

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr.as_str()).await?;
    info!("✅ Listening on http://{}", listener.local_addr()?);
    info!("🔄 Press CTRL+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    info!("✅ floorcap server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }
}
