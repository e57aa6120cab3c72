//! Core data structures for the history engine

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One timestamped floor-price record.
///
/// Serialized with camelCase keys; this JSON is the member stored in the
/// sample store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub floor_price: f64,
    pub market_cap: f64,
    pub total_supply: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Observation {
    /// Build an observation, deriving market cap from price and supply.
    pub fn new(floor_price: f64, total_supply: u64, timestamp: i64) -> Self {
        Self {
            floor_price,
            market_cap: floor_price * total_supply as f64,
            total_supply,
            timestamp,
        }
    }

    pub fn has_valid_price(&self) -> bool {
        self.floor_price > 0.0
    }

    pub fn to_member(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_member(member: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(member)
    }
}

/// Window name → percent change, `None` when no comparison point qualified.
pub type ChangeMap = BTreeMap<String, Option<f64>>;

/// Counters describing what the query service did to the raw series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub total_points: usize,
    pub filtered_points: usize,
    pub removed_outliers: usize,
    pub invalid_points: usize,
    pub malformed_records: usize,
    pub threshold: Option<f64>,
    pub oldest: Option<String>,
    pub newest: Option<String>,
}

/// Response of a history query. Every outcome, including faults, has this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReport {
    pub series: Vec<Observation>,
    pub changes: ChangeMap,
    pub current: Option<Observation>,
    pub data_points: usize,
    pub diagnostics: Diagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryReport {
    /// Empty report with every configured window set to `None`.
    pub fn empty<'a>(window_names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            series: Vec::new(),
            changes: window_names
                .into_iter()
                .map(|name| (name.to_string(), None))
                .collect(),
            current: None,
            data_points: 0,
            diagnostics: Diagnostics::default(),
            message: None,
            error: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Render a millisecond timestamp as RFC 3339 (UTC).
pub fn iso_timestamp(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt: DateTime<Utc>| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
