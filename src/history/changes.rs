//! Point-in-time percent changes over irregularly sampled series

use super::types::{ChangeMap, Observation};
use super::windows::LookbackWindow;

/// Observation nearest to `target_ms`, provided it lies within `tolerance_ms`.
///
/// Distance exactly equal to the tolerance qualifies. On ties the first point
/// in input order wins, which for a time-sorted series is the earliest.
pub fn closest_within_tolerance(
    series: &[Observation],
    target_ms: i64,
    tolerance_ms: i64,
) -> Option<&Observation> {
    let mut best: Option<(&Observation, i64)> = None;

    for obs in series {
        let diff = obs.timestamp.abs_diff(target_ms);
        if diff > tolerance_ms.max(0) as u64 {
            continue;
        }
        let diff = diff as i64;
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((obs, diff)),
        }
    }

    best.map(|(obs, _)| obs)
}

/// `(current - reference) / reference * 100`, or `None` if either side is
/// missing or the reference price is zero.
pub fn percent_change(reference: Option<&Observation>, current: Option<&Observation>) -> Option<f64> {
    let (reference, current) = (reference?, current?);
    if reference.floor_price == 0.0 {
        return None;
    }
    Some((current.floor_price - reference.floor_price) / reference.floor_price * 100.0)
}

/// Percent change for every window in the table, measured against `current`.
pub fn compute_changes(
    series: &[Observation],
    current: Option<&Observation>,
    windows: &[LookbackWindow],
    now_ms: i64,
) -> ChangeMap {
    windows
        .iter()
        .map(|window| {
            let reference = closest_within_tolerance(series, window.target(now_ms), window.tolerance_ms);
            (window.name.clone(), percent_change(reference, current))
        })
        .collect()
}
