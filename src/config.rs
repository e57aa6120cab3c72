//! Runtime configuration from environment variables
//!
//! A `.env` file is loaded by the binaries before `AppConfig::from_env` runs.
//! Malformed numbers fall back to their defaults; a malformed window table or
//! unknown enum value is a configuration error.
//!
//! Variables (default):
//!   FLOORCAP_DB_PATH (data/floorcap.db), FLOORCAP_BIND (0.0.0.0:8080),
//!   COLLECTION_CONTRACT (`DEFAULT_CONTRACT`)
//!   ALCHEMY_API_KEY, DUNE_API_KEY (unset)
//!   ALCHEMY_BASE_URL, DUNE_BASE_URL, COINGECKO_BASE_URL (public endpoints)
//!   RETENTION_DAYS (365), HISTORY_RANGE_MS (unbounded)
//!   LOOKBACK_WINDOWS (hour, day, week, month, quarter)
//!   OUTLIER_PERCENTILE (0.90), OUTLIER_MEDIAN_MULT (3), OUTLIER_PERCENTILE_MULT (1.5)
//!   OUTLIER_COMBINE (min), CURRENT_SOURCE (filtered)
//!   BACKFILL_MAX_ATTEMPTS (60), BACKFILL_POLL_DELAY_MS (5000), BACKFILL_FALLBACK_SUPPLY (56741)
//!   INGEST_INTERVAL_MS (0), RATES_CACHE_MS (60000), HTTP_TIMEOUT_MS (10000)

use crate::backfill::PollPolicy;
use crate::error::{TrackerError, TrackerResult};
use crate::history::outlier::{OutlierConfig, ThresholdCombine};
use crate::history::service::CurrentSource;
use crate::history::windows::{parse_window_table, LookbackWindow, DEFAULT_WINDOWS};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONTRACT: &str = "0xca21d4228cdcc68d4e23807e5e370c07577dd152";

/// Path value that selects the in-memory sample store.
pub const MEMORY_DB_PATH: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite file, or `:memory:`
    pub db_path: String,
    pub bind_addr: String,
    pub contract: String,

    pub alchemy_api_key: Option<String>,
    pub alchemy_base_url: String,
    pub dune_api_key: Option<String>,
    pub dune_base_url: String,
    pub coingecko_base_url: String,

    pub retention_days: u32,
    pub history_range_ms: Option<i64>,
    pub windows: Vec<LookbackWindow>,
    pub outlier: OutlierConfig,
    pub current_source: CurrentSource,

    pub backfill_poll: PollPolicy,
    pub backfill_fallback_supply: u64,

    /// 0 disables the in-process ingestion ticker
    pub ingest_interval_ms: u64,
    pub rates_cache_ms: u64,
    pub http_timeout_ms: u64,
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// Variables and defaults are listed in the module docs above.
    pub fn from_env() -> TrackerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TrackerResult<Self> {
        let windows_spec = non_empty(&lookup, "LOOKBACK_WINDOWS").unwrap_or_else(|| DEFAULT_WINDOWS.to_string());
        let windows = parse_window_table(&windows_spec)?;

        let combine = match non_empty(&lookup, "OUTLIER_COMBINE") {
            Some(s) => s.parse::<ThresholdCombine>()?,
            None => ThresholdCombine::Min,
        };

        let current_source = match non_empty(&lookup, "CURRENT_SOURCE") {
            Some(s) => s.parse::<CurrentSource>()?,
            None => CurrentSource::Filtered,
        };

        let defaults = OutlierConfig::default();
        let percentile = parsed(&lookup, "OUTLIER_PERCENTILE", defaults.percentile);
        if !(percentile > 0.0 && percentile <= 1.0) {
            return Err(TrackerError::config(format!(
                "OUTLIER_PERCENTILE must be in (0, 1], got {}",
                percentile
            )));
        }
        let outlier = OutlierConfig {
            percentile,
            median_multiplier: parsed(&lookup, "OUTLIER_MEDIAN_MULT", defaults.median_multiplier),
            percentile_multiplier: parsed(&lookup, "OUTLIER_PERCENTILE_MULT", defaults.percentile_multiplier),
            combine,
            ..defaults
        };

        let poll_defaults = PollPolicy::default();

        Ok(Self {
            db_path: non_empty(&lookup, "FLOORCAP_DB_PATH").unwrap_or_else(|| "data/floorcap.db".to_string()),
            bind_addr: non_empty(&lookup, "FLOORCAP_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            contract: non_empty(&lookup, "COLLECTION_CONTRACT").unwrap_or_else(|| DEFAULT_CONTRACT.to_string()),

            alchemy_api_key: non_empty(&lookup, "ALCHEMY_API_KEY"),
            alchemy_base_url: non_empty(&lookup, "ALCHEMY_BASE_URL")
                .unwrap_or_else(|| "https://eth-mainnet.g.alchemy.com".to_string()),
            dune_api_key: non_empty(&lookup, "DUNE_API_KEY"),
            dune_base_url: non_empty(&lookup, "DUNE_BASE_URL").unwrap_or_else(|| "https://api.dune.com".to_string()),
            coingecko_base_url: non_empty(&lookup, "COINGECKO_BASE_URL")
                .unwrap_or_else(|| "https://api.coingecko.com".to_string()),

            retention_days: parsed(&lookup, "RETENTION_DAYS", 365),
            history_range_ms: non_empty(&lookup, "HISTORY_RANGE_MS")
                .and_then(|s| s.parse().ok())
                .filter(|ms: &i64| *ms > 0),
            windows,
            outlier,
            current_source,

            backfill_poll: PollPolicy {
                max_attempts: parsed(&lookup, "BACKFILL_MAX_ATTEMPTS", poll_defaults.max_attempts),
                delay: Duration::from_millis(parsed(
                    &lookup,
                    "BACKFILL_POLL_DELAY_MS",
                    poll_defaults.delay.as_millis() as u64,
                )),
            },
            backfill_fallback_supply: parsed(&lookup, "BACKFILL_FALLBACK_SUPPLY", 56_741),

            ingest_interval_ms: parsed(&lookup, "INGEST_INTERVAL_MS", 0),
            rates_cache_ms: parsed(&lookup, "RATES_CACHE_MS", 60_000),
            http_timeout_ms: parsed(&lookup, "HTTP_TIMEOUT_MS", 10_000),
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.db_path == MEMORY_DB_PATH
    }
}
