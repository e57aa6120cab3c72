//! Lookback window table
//!
//! Each window is a `(name, duration, tolerance)` triple. The table is
//! configuration: deployments may swap the hour/day/week/month/quarter set for
//! something like 7h/7d/7w/77d without touching the calculator.

use crate::error::{TrackerError, TrackerResult};

pub const MINUTE_MS: i64 = 60 * 1000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const WEEK_MS: i64 = 7 * DAY_MS;

/// Default table in `LOOKBACK_WINDOWS` syntax.
pub const DEFAULT_WINDOWS: &str = "hour:1h:2h,day:24h:12h,week:7d:24h,month:30d:48h,quarter:77d:72h";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookbackWindow {
    pub name: String,
    pub duration_ms: i64,
    /// Max distance between target time and a qualifying observation
    pub tolerance_ms: i64,
}

impl LookbackWindow {
    pub fn new(name: impl Into<String>, duration_ms: i64, tolerance_ms: i64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            tolerance_ms,
        }
    }

    /// Timestamp this window compares against.
    pub fn target(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.duration_ms)
    }

    /// Sampling is roughly one point per 6 hours, so tolerance grows with the window.
    pub fn default_table() -> Vec<LookbackWindow> {
        vec![
            LookbackWindow::new("hour", HOUR_MS, 2 * HOUR_MS),
            LookbackWindow::new("day", DAY_MS, 12 * HOUR_MS),
            LookbackWindow::new("week", WEEK_MS, 24 * HOUR_MS),
            LookbackWindow::new("month", 30 * DAY_MS, 48 * HOUR_MS),
            LookbackWindow::new("quarter", 77 * DAY_MS, 72 * HOUR_MS),
        ]
    }
}

/// Parse a duration such as `90m`, `7h`, `77d`, `7w` or a bare millisecond count.
pub fn parse_duration_ms(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (digits, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, "ms"),
    };
    let value: i64 = digits.parse().ok()?;
    let unit_ms = match unit {
        "ms" => 1,
        "s" => 1000,
        "m" => MINUTE_MS,
        "h" => HOUR_MS,
        "d" => DAY_MS,
        "w" => WEEK_MS,
        _ => return None,
    };
    value.checked_mul(unit_ms)
}

/// Parse a comma-separated `name:duration:tolerance` table.
///
/// Names must be unique and durations positive; tolerance may be zero.
pub fn parse_window_table(spec: &str) -> TrackerResult<Vec<LookbackWindow>> {
    let mut windows: Vec<LookbackWindow> = Vec::new();

    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        if parts.len() != 3 || parts[0].is_empty() {
            return Err(TrackerError::config(format!(
                "window entry '{}' must look like name:duration:tolerance",
                entry
            )));
        }

        let duration_ms = parse_duration_ms(parts[1])
            .filter(|d| *d > 0)
            .ok_or_else(|| TrackerError::config(format!("bad window duration '{}'", parts[1])))?;
        let tolerance_ms = parse_duration_ms(parts[2])
            .ok_or_else(|| TrackerError::config(format!("bad window tolerance '{}'", parts[2])))?;

        if windows.iter().any(|w| w.name == parts[0]) {
            return Err(TrackerError::config(format!("duplicate window name '{}'", parts[0])));
        }

        windows.push(LookbackWindow::new(parts[0], duration_ms, tolerance_ms));
    }

    if windows.is_empty() {
        return Err(TrackerError::config("window table is empty"));
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration_ms("7h"), Some(7 * HOUR_MS));
        assert_eq!(parse_duration_ms("77d"), Some(77 * DAY_MS));
        assert_eq!(parse_duration_ms("7w"), Some(7 * WEEK_MS));
        assert_eq!(parse_duration_ms("90m"), Some(90 * MINUTE_MS));
        assert_eq!(parse_duration_ms("1500"), Some(1500));
        assert_eq!(parse_duration_ms("3x"), None);
        assert_eq!(parse_duration_ms(""), None);
    }

    #[test]
    fn test_default_string_matches_default_table() {
        let parsed = parse_window_table(DEFAULT_WINDOWS).unwrap();
        assert_eq!(parsed, LookbackWindow::default_table());
    }

    #[test]
    fn test_seven_series_table() {
        let parsed = parse_window_table("7h:7h:2h, 7d:7d:12h, 7w:7w:24h, 77d:77d:72h").unwrap();
        let names: Vec<&str> = parsed.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["7h", "7d", "7w", "77d"]);
        assert_eq!(parsed[3].tolerance_ms, 72 * HOUR_MS);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(parse_window_table("").is_err());
        assert!(parse_window_table("day:24h").is_err());
        assert!(parse_window_table("day:0h:1h").is_err());
        assert!(parse_window_table("day:24h:1h,day:48h:1h").is_err());
    }

    #[test]
    fn test_target() {
        let w = LookbackWindow::new("day", DAY_MS, HOUR_MS);
        assert_eq!(w.target(10 * DAY_MS), 9 * DAY_MS);
    }

    #[test]
    fn test_huge_duration_target_saturates() {
        let table = parse_window_table("forever:9223372036854775807:1h").unwrap();
        assert_eq!(table[0].duration_ms, i64::MAX);
        assert_eq!(table[0].target(-DAY_MS), i64::MIN);
        assert_eq!(table[0].target(0), -i64::MAX);
    }
}
