//! Counter deltas and the on-time rate formula

use crate::types::Sample;

/// Upper bound of [`on_time_rate`], in percent
pub const MAX_RATE_PERCENT: f64 = 100.0;

/// Increase of a monotonic counter. A decrease (hardware reset) counts as zero.
pub fn counter_delta(previous: f64, current: f64) -> f64 {
    (current - previous).max(0.0)
}

/// Light-source on-time as a percentage of the wall-clock time between two
/// samples: `min(100, 100 × Δon_time / Δt_seconds)`.
///
/// Returns 0 when `current` is not strictly later than `previous`.
pub fn on_time_rate(current: &Sample, previous: &Sample) -> f64 {
    let elapsed_ms = (current.created_at - previous.created_at).num_milliseconds();
    if elapsed_ms <= 0 {
        return 0.0;
    }
    let elapsed_secs = elapsed_ms as f64 / 1000.0;
    let delta = counter_delta(
        f64::from(previous.record.light_source_on_time),
        f64::from(current.record.light_source_on_time),
    );
    (100.0 * delta / elapsed_secs).min(MAX_RATE_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::{sample_at, t0};
    use approx::assert_relative_eq;
    use chrono::Duration;

    #[test]
    fn test_rate_half_on() {
        let prev = sample_at(t0()).on_time(1_000).build();
        let curr = sample_at(t0() + Duration::seconds(100)).on_time(1_050).build();
        assert_relative_eq!(on_time_rate(&curr, &prev), 50.0);
    }

    #[test]
    fn test_rate_is_capped() {
        let prev = sample_at(t0()).on_time(0).build();
        let curr = sample_at(t0() + Duration::seconds(10)).on_time(500).build();
        assert_relative_eq!(on_time_rate(&curr, &prev), 100.0);
    }

    #[test]
    fn test_rate_zero_elapsed() {
        let prev = sample_at(t0()).on_time(0).build();
        let curr = sample_at(t0()).on_time(10).build();
        assert_relative_eq!(on_time_rate(&curr, &prev), 0.0);
        // reversed order
        assert_relative_eq!(on_time_rate(&prev, &curr), 0.0);
    }

    #[test]
    fn test_counter_reset_clamps() {
        assert_relative_eq!(counter_delta(500.0, 20.0), 0.0);
        assert_relative_eq!(counter_delta(20.0, 500.0), 480.0);
    }
}
