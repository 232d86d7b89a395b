//! General time utility functions

use std::time::Duration;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a chrono duration into seconds, or `None` if the number of
/// nanoseconds overflows.
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Get the period of a cycle running at the given frequency.
///
/// Returns `None` for frequencies which are not strictly positive and finite, or so low that the
/// period cannot be represented.
pub fn period_from_frequency(frequency_hz: f64) -> Option<Duration> {
    if frequency_hz.is_finite() && frequency_hz > 0.0 {
        Duration::try_from_secs_f64(1.0 / frequency_hz).ok()
    } else {
        None
    }
}
