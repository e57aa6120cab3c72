//! Outlier filter for floor-price spikes
//!
//! Upstream marketplaces occasionally report absurd floors (a single listing
//! glitch can read 100x the real floor). The filter computes a robust
//! threshold from the median and a high percentile of positive prices and
//! drops every observation priced above it.

use super::types::Observation;
use crate::error::TrackerError;
use std::str::FromStr;

/// How the two candidate thresholds are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdCombine {
    /// Lower of the two: aggressive
    Min,
    /// Higher of the two: lenient
    Max,
}

impl FromStr for ThresholdCombine {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(ThresholdCombine::Min),
            "max" => Ok(ThresholdCombine::Max),
            _ => Err(TrackerError::config(format!(
                "OUTLIER_COMBINE must be 'min' or 'max', got '{}'",
                s
            ))),
        }
    }
}

impl ThresholdCombine {

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdCombine::Min => "min",
            ThresholdCombine::Max => "max",
        }
    }
}

/// Tuning constants, injected at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierConfig {
    /// Series shorter than this pass through untouched
    pub min_points: usize,
    /// Quantile in `[0, 1]` used for the percentile statistic
    pub percentile: f64,
    /// k1: threshold candidate `median * k1`
    pub median_multiplier: f64,
    /// k2: threshold candidate `percentile * k2`
    pub percentile_multiplier: f64,
    pub combine: ThresholdCombine,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            min_points: 5,
            percentile: 0.90,
            median_multiplier: 3.0,
            percentile_multiplier: 1.5,
            combine: ThresholdCombine::Min,
        }
    }
}

/// Result of a filter pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub series: Vec<Observation>,
    /// `None` when the filter did not run (short or priceless series)
    pub threshold: Option<f64>,
}

impl FilterOutcome {
    fn passthrough(series: &[Observation]) -> Self {
        Self {
            series: series.to_vec(),
            threshold: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutlierFilter {
    config: OutlierConfig,
}

impl OutlierFilter {
    pub fn new(config: OutlierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutlierConfig {
        &self.config
    }

    /// Rejection threshold for a series, or `None` if the series is too short
    /// or holds no positive price.
    pub fn threshold(&self, series: &[Observation]) -> Option<f64> {
        if series.len() < self.config.min_points {
            return None;
        }

        let mut prices: Vec<f64> = series
            .iter()
            .map(|o| o.floor_price)
            .filter(|p| *p > 0.0)
            .collect();
        if prices.is_empty() {
            return None;
        }
        prices.sort_by(|a, b| a.total_cmp(b));

        let median = median_sorted(&prices);
        let pct = percentile_sorted(&prices, self.config.percentile);

        let by_median = median * self.config.median_multiplier;
        let by_percentile = pct * self.config.percentile_multiplier;

        Some(match self.config.combine {
            ThresholdCombine::Min => by_median.min(by_percentile),
            ThresholdCombine::Max => by_median.max(by_percentile),
        })
    }

    /// Filter a chronological series, keeping order. Pure.
    pub fn apply(&self, series: &[Observation]) -> FilterOutcome {
        let Some(threshold) = self.threshold(series) else {
            return FilterOutcome::passthrough(series);
        };

        let kept: Vec<Observation> = series
            .iter()
            .filter(|o| o.floor_price <= threshold)
            .cloned()
            .collect();

        if kept.len() < series.len() {
            log::debug!(
                "🧹 Outlier filter removed {} of {} points (threshold {:.6})",
                series.len() - kept.len(),
                series.len(),
                threshold
            );
        }

        FilterOutcome {
            series: kept,
            threshold: Some(threshold),
        }
    }

    pub fn filter(&self, series: &[Observation]) -> Vec<Observation> {
        self.apply(series).series
    }
}

/// Median of an ascending, non-empty slice. Even lengths average the middle pair.
fn median_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Nearest-rank percentile: index `floor(n * q)`, clamped to the last element.
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let q = q.clamp(0.0, 1.0);
    let idx = ((sorted.len() as f64) * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
