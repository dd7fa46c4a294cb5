//! Weekday peak-hour detection.

use chrono::{Datelike as _, NaiveDateTime, Timelike as _, Weekday};
use taxi_zones_fare_models::PeakWindow;

/// Returns `true` if the local time is Monday–Friday inside one of the
/// windows.
#[must_use]
pub fn is_peak(local_time: NaiveDateTime, windows: &[PeakWindow]) -> bool {
    let weekday = !matches!(local_time.weekday(), Weekday::Sat | Weekday::Sun);
    weekday && windows.iter().any(|w| w.contains_hour(local_time.hour()))
}

/// The multiplier to apply at `local_time`: `peak_multiplier` during peak,
/// `1.0` otherwise.
#[must_use]
pub fn peak_multiplier_at(
    local_time: NaiveDateTime,
    windows: &[PeakWindow],
    peak_multiplier: f64,
) -> f64 {
    if is_peak(local_time, windows) {
        peak_multiplier
    } else {
        1.0
    }
}
