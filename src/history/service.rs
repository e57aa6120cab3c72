//! History query service
//!
//! Read path: store → parse (drop malformed) → sort → outlier filter →
//! drop invalid prices → current point → per-window changes → report.

use super::changes::compute_changes;
use super::outlier::OutlierFilter;
use super::types::{iso_timestamp, Diagnostics, HistoryReport, Observation};
use super::windows::LookbackWindow;
use crate::error::{TrackerError, TrackerResult};
use crate::store::SampleStore;
use std::str::FromStr;
use std::sync::Arc;

pub const NO_DATA_MESSAGE: &str = "no data yet - collecting";

/// Which observation is reported as `current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentSource {
    /// Last observation that survived outlier filtering
    Filtered,
    /// Last valid observation, even if the filter rejected it
    Raw,
}

impl FromStr for CurrentSource {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filtered" => Ok(CurrentSource::Filtered),
            "raw" => Ok(CurrentSource::Raw),
            _ => Err(TrackerError::config(format!(
                "CURRENT_SOURCE must be 'filtered' or 'raw', got '{}'",
                s
            ))),
        }
    }
}

/// Parsed series plus the number of records that failed to parse.
#[derive(Debug, Clone, Default)]
pub struct LoadedSeries {
    pub observations: Vec<Observation>,
    pub malformed: usize,
}

pub struct HistoryService {
    store: Arc<dyn SampleStore>,
    filter: OutlierFilter,
    windows: Vec<LookbackWindow>,
    current_source: CurrentSource,
    /// Only read the last N ms when set
    range_ms: Option<i64>,
}

impl HistoryService {
    pub fn new(
        store: Arc<dyn SampleStore>,
        filter: OutlierFilter,
        windows: Vec<LookbackWindow>,
    ) -> Self {
        Self {
            store,
            filter,
            windows,
            current_source: CurrentSource::Filtered,
            range_ms: None,
        }
    }

    pub fn with_current_source(mut self, source: CurrentSource) -> Self {
        self.current_source = source;
        self
    }

    pub fn with_range_ms(mut self, range_ms: Option<i64>) -> Self {
        self.range_ms = range_ms.filter(|r| *r > 0);
        self
    }

    pub fn windows(&self) -> &[LookbackWindow] {
        &self.windows
    }

    fn window_names(&self) -> impl Iterator<Item = &str> {
        self.windows.iter().map(|w| w.name.as_str())
    }

    /// Build the history report as of `now_ms`. Never fails: faults come back
    /// as an empty report with `error` set.
    pub async fn get_history(&self, now_ms: i64) -> HistoryReport {
        match self.try_get_history(now_ms).await {
            Ok(report) => report,
            Err(e) => {
                log::error!("❌ History query failed: {}", e);
                let mut report = HistoryReport::empty(self.window_names());
                report.error = Some(e.to_string());
                report
            }
        }
    }

    /// Read, parse and time-sort the stored series. Malformed records are skipped.
    pub async fn load_series(&self, now_ms: i64) -> TrackerResult<LoadedSeries> {
        let members = match self.range_ms {
            Some(range) => self.store.range_since(now_ms.saturating_sub(range)).await?,
            None => self.store.range_all().await?,
        };

        let mut loaded = LoadedSeries::default();
        for member in &members {
            match Observation::from_member(member) {
                Ok(obs) => loaded.observations.push(obs),
                Err(e) => {
                    loaded.malformed += 1;
                    log::warn!("⚠️  Dropping malformed record: {}", e);
                }
            }
        }

        // Store order is not time order when writers interleave
        loaded.observations.sort_by_key(|o| o.timestamp);
        Ok(loaded)
    }

    async fn try_get_history(&self, now_ms: i64) -> TrackerResult<HistoryReport> {
        let loaded = self.load_series(now_ms).await?;
        let total_points = loaded.observations.len();

        let sorted = loaded.observations;
        let invalid_points = sorted.iter().filter(|o| !o.has_valid_price()).count();

        let mut diagnostics = Diagnostics {
            total_points,
            invalid_points,
            malformed_records: loaded.malformed,
            ..Diagnostics::default()
        };

        if invalid_points == total_points {
            let mut report = HistoryReport::empty(self.window_names());
            report.diagnostics = diagnostics;
            report.message = Some(NO_DATA_MESSAGE.to_string());
            return Ok(report);
        }

        // The minimum-size gate counts every parsed record, priced or not
        let outcome = self.filter.apply(&sorted);
        let filtered: Vec<Observation> = outcome
            .series
            .into_iter()
            .filter(Observation::has_valid_price)
            .collect();

        let current = match self.current_source {
            CurrentSource::Filtered => filtered.last().cloned(),
            CurrentSource::Raw => sorted.iter().rev().find(|o| o.has_valid_price()).cloned(),
        };

        let changes = compute_changes(&filtered, current.as_ref(), &self.windows, now_ms);

        diagnostics.filtered_points = filtered.len();
        diagnostics.removed_outliers = (total_points - invalid_points) - filtered.len();
        diagnostics.threshold = outcome.threshold;
        diagnostics.oldest = filtered.first().and_then(|o| iso_timestamp(o.timestamp));
        diagnostics.newest = current.as_ref().and_then(|o| iso_timestamp(o.timestamp));

        log::debug!(
            "📈 History: {} raw, {} kept, {} outliers, {} invalid, {} malformed",
            total_points,
            filtered.len(),
            diagnostics.removed_outliers,
            diagnostics.invalid_points,
            diagnostics.malformed_records
        );

        Ok(HistoryReport {
            data_points: filtered.len(),
            series: filtered,
            changes,
            current,
            diagnostics,
            message: None,
            error: None,
        })
    }
}
