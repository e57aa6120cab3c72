//! Historical backfill from an analytical query
//!
//! ```text
//! execute(query_id) → execution_id
//!     ↓
//! poll_until_complete (≤ max_attempts, fixed delay before each poll)
//!     ↓
//! rows {day, floor_price} → 4 observations per day (+0h/+6h/+12h/+18h)
//!     ↓
//! SampleStore::append_batch
//! ```

use crate::error::{TrackerError, TrackerResult};
use crate::history::types::Observation;
use crate::history::windows::HOUR_MS;
use crate::provider::{PriceProvider, QueryPoll, QueryProvider};
use crate::store::SampleStore;
use chrono::{NaiveDate, NaiveDateTime, DateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Offsets of the synthesized points within each day.
pub const DAY_POINT_OFFSETS_MS: [i64; 4] = [0, 6 * HOUR_MS, 12 * HOUR_MS, 18 * HOUR_MS];

const SAMPLE_ROWS: usize = 3;

/// Bounded polling: at most `max_attempts` polls, `delay` before each.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            delay: Duration::from_millis(5_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<Value>,
    pub to: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub success: bool,
    pub message: String,
    pub days: usize,
    pub stored: usize,
    pub skipped_rows: usize,
    pub total_supply: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    pub sample: Vec<Value>,
}

/// One usable `{day, floor_price}` row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyFloor {
    pub day_ms: i64,
    pub floor_price: f64,
}

/// Setup steps returned when the analytical query is not configured.
pub fn query_setup_instructions(contract: &str) -> Vec<String> {
    vec![
        "1. Go to dune.com and create this query:".to_string(),
        String::new(),
        "SELECT".to_string(),
        "  date_trunc('day', block_time) as day,".to_string(),
        "  MIN(amount_raw / 1e18) as floor_price".to_string(),
        "FROM nft.trades".to_string(),
        format!("WHERE nft_contract_address = {}", contract),
        "  AND amount_raw > 0".to_string(),
        "  AND block_time >= NOW() - INTERVAL '365' DAY".to_string(),
        "GROUP BY 1".to_string(),
        "ORDER BY 1 ASC".to_string(),
        String::new(),
        "2. Save the query and copy the query ID from the URL (e.g. dune.com/queries/123456)".to_string(),
        "3. Call: /api/backfill?dune_key=YOUR_KEY&query_id=123456".to_string(),
    ]
}

/// Poll an execution until it completes, fails, or the attempt budget runs out.
///
/// A poll that errors (non-2xx, network) consumes an attempt and the loop
/// continues; a reported failure stops immediately.
pub async fn poll_until_complete(
    query: &dyn QueryProvider,
    execution_id: &str,
    policy: PollPolicy,
) -> TrackerResult<Vec<Value>> {
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.delay).await;

        match query.poll_result(execution_id).await {
            Ok(QueryPoll::Completed(rows)) => {
                log::info!("✅ Query {} completed after {} polls ({} rows)", execution_id, attempt, rows.len());
                return Ok(rows);
            }
            Ok(QueryPoll::Failed(reason)) => {
                return Err(TrackerError::UpstreamFailed(format!("query failed: {}", reason)));
            }
            Ok(QueryPoll::Pending(state)) => {
                log::debug!("⏳ Query {} state {} (attempt {}/{})", execution_id, state, attempt, policy.max_attempts);
            }
            Err(e) => {
                log::warn!("⚠️  Poll {}/{} for {} failed: {}", attempt, policy.max_attempts, execution_id, e);
            }
        }
    }

    Err(TrackerError::Timeout {
        attempts: policy.max_attempts,
    })
}

/// Parse the `day` column. Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff][ UTC]`
/// and a bare date, all read as UTC.
pub fn parse_day_ms(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    let naive = s.trim_end_matches(" UTC").trim_end_matches('Z');
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn parse_price(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Returns `None` for rows with an unusable day or a missing, unparsable or
/// non-positive price.
pub fn parse_row(row: &Value) -> Option<DailyFloor> {
    let day_ms = parse_day_ms(row.get("day")?.as_str()?)?;
    let floor_price = parse_price(row.get("floor_price")?)?;
    if !(floor_price > 0.0) || !floor_price.is_finite() {
        return None;
    }
    Some(DailyFloor { day_ms, floor_price })
}

/// Four observations per day, one at each of `DAY_POINT_OFFSETS_MS`.
pub fn synthesize_day(row: DailyFloor, total_supply: u64) -> Vec<Observation> {
    DAY_POINT_OFFSETS_MS
        .iter()
        .map(|offset| Observation::new(row.floor_price, total_supply, row.day_ms + offset))
        .collect()
}

pub struct Backfiller {
    store: Arc<dyn SampleStore>,
    supply_provider: Option<Arc<dyn PriceProvider>>,
    contract: String,
    fallback_supply: u64,
    policy: PollPolicy,
}

impl Backfiller {
    pub fn new(
        store: Arc<dyn SampleStore>,
        contract: impl Into<String>,
        fallback_supply: u64,
        policy: PollPolicy,
    ) -> Self {
        Self {
            store,
            supply_provider: None,
            contract: contract.into(),
            fallback_supply,
            policy,
        }
    }

    pub fn with_supply_provider(mut self, provider: Arc<dyn PriceProvider>) -> Self {
        self.supply_provider = Some(provider);
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    async fn resolve_supply(&self) -> u64 {
        let Some(provider) = &self.supply_provider else {
            return self.fallback_supply;
        };
        match provider.total_supply(&self.contract).await {
            Ok(supply) if supply > 0 => supply,
            Ok(_) => self.fallback_supply,
            Err(e) => {
                log::warn!("⚠️  Supply lookup failed, using fallback {}: {}", self.fallback_supply, e);
                self.fallback_supply
            }
        }
    }

    /// Run `query_id` to completion and store the synthesized series.
    pub async fn run(&self, query: &dyn QueryProvider, query_id: &str) -> TrackerResult<BackfillReport> {
        let query_id = query_id.trim();
        if query_id.is_empty() {
            return Err(TrackerError::BadRequest {
                message: "Query ID required. Pass as ?query_id=YOUR_QUERY_ID".to_string(),
                instructions: query_setup_instructions(&self.contract),
            });
        }

        log::info!("🚀 Executing backfill query {}", query_id);
        let execution_id = query.execute(query_id).await?;
        log::info!("   └─ execution {}", execution_id);

        let rows = poll_until_complete(query, &execution_id, self.policy).await?;

        if rows.is_empty() {
            return Ok(BackfillReport {
                success: false,
                message: "No data returned from the query. Check the query definition.".to_string(),
                days: 0,
                stored: 0,
                skipped_rows: 0,
                total_supply: self.fallback_supply,
                date_range: None,
                sample: Vec::new(),
            });
        }

        let total_supply = self.resolve_supply().await;

        let mut entries = Vec::with_capacity(rows.len() * DAY_POINT_OFFSETS_MS.len());
        let mut skipped = 0usize;
        for row in &rows {
            match parse_row(row) {
                Some(daily) => {
                    for obs in synthesize_day(daily, total_supply) {
                        entries.push((obs.timestamp, obs.to_member()?));
                    }
                }
                None => {
                    log::debug!("⏭️  Skipping unusable row {}", row);
                    skipped += 1;
                }
            }
        }

        let stored = if entries.is_empty() {
            0
        } else {
            self.store.append_batch(entries).await?
        };
        let days = rows.len();

        log::info!("✅ Backfilled {} days ({} data points, {} rows skipped)", days, stored, skipped);

        Ok(BackfillReport {
            success: true,
            message: format!("Backfilled {} days ({} data points)", days, stored),
            days,
            stored,
            skipped_rows: skipped,
            total_supply,
            date_range: Some(DateRange {
                from: rows.first().and_then(|r| r.get("day").cloned()),
                to: rows.last().and_then(|r| r.get("day").cloned()),
            }),
            sample: rows.iter().take(SAMPLE_ROWS).cloned().collect(),
        })
    }
}
