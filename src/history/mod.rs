//! History aggregation engine
//!
//! Turns the irregularly sampled observation log into a cleaned series and
//! per-window percent changes.
//!
//! ```text
//! SampleStore → HistoryService::load_series (parse, drop malformed, sort)
//!     ↓
//! OutlierFilter (median / percentile threshold)
//!     ↓
//! compute_changes (closest point within tolerance per LookbackWindow)
//!     ↓
//! HistoryReport { series, changes, current, diagnostics }
//! ```

pub mod changes;
pub mod outlier;
pub mod service;
pub mod types;
pub mod windows;

pub use changes::{closest_within_tolerance, compute_changes, percent_change};
pub use outlier::{FilterOutcome, OutlierConfig, OutlierFilter, ThresholdCombine};
pub use service::{CurrentSource, HistoryService, LoadedSeries, NO_DATA_MESSAGE};
pub use types::{ChangeMap, Diagnostics, HistoryReport, Observation};
pub use windows::{parse_window_table, LookbackWindow};
