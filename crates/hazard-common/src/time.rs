//! Model-cycle time helpers.
//!
//! A cycle is an hour-aligned UTC timestamp identifying one model run; the
//! valid time of a field is cycle + forecast hour.

use chrono::{DateTime, Duration, Timelike, Utc};

/// Truncate a timestamp to the top of its hour.
pub fn truncate_to_hour(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_minute(0)
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Format a cycle timestamp as e.g. "2026-02-22T02:00Z".
pub fn cycle_iso(cycle: DateTime<Utc>) -> String {
    cycle.format("%Y-%m-%dT%H:%MZ").to_string()
}

/// Format the valid time of (cycle, fxx) as e.g. "2026-02-22T03:00Z".
pub fn valid_iso(cycle: DateTime<Utc>, fxx: u8) -> String {
    cycle_iso(cycle + Duration::hours(fxx as i64))
}
