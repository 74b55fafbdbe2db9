//! Live status snapshot of one gear

use chrono::{DateTime, Utc};

use super::rate::counter_delta;
use crate::types::{Sample, StatusSnapshot};

/// Today's samples needed before the earliest one is used as baseline.
pub const MIN_BASELINE_SAMPLES: usize = 3;

/// Build a snapshot from one gear's samples captured since `day_start`.
///
/// Deltas run from the earliest sample of the day to the latest. With fewer
/// than [`MIN_BASELINE_SAMPLES`] samples the latest is its own baseline and
/// every delta is zero. `None` when there are no samples.
pub fn build_status(
    mut today: Vec<Sample>,
    day_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<StatusSnapshot> {
    today.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let latest = today.first()?;
    let baseline = if today.len() >= MIN_BASELINE_SAMPLES {
        today.last()?
    } else {
        latest
    };

    let (last, base) = (&latest.record, &baseline.record);
    let on_time = counter_delta(
        f64::from(base.light_source_on_time),
        f64::from(last.light_source_on_time),
    );
    let elapsed_secs = (now - day_start).num_milliseconds() as f64 / 1000.0;
    let on_time_rate = if elapsed_secs > 0.0 { on_time / elapsed_secs } else { 0.0 };

    Some(StatusSnapshot {
        is_dc: last.is_dc(),
        on_time_rate,
        start_count: counter_delta(
            f64::from(base.light_source_start_count),
            f64::from(last.light_source_start_count),
        ),
        energy_usage: counter_delta(base.apparent_energy, last.apparent_energy),
        latest: latest.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::{sample_at, t0};
    use approx::assert_relative_eq;
    use chrono::Duration;

    #[test]
    fn test_deltas_from_first_sample_of_day() {
        let now = t0() + Duration::hours(10);
        let samples = vec![
            sample_at(t0() + Duration::hours(5)).on_time(2_000).start_count(11).apparent(3.0).build(),
            sample_at(t0() + Duration::hours(9)).on_time(19_000).start_count(14).apparent(7.5).frequency(50).build(),
            sample_at(t0() + Duration::hours(1)).on_time(1_000).start_count(10).apparent(1.0).build(),
        ];

        let status = build_status(samples, t0(), now).unwrap();
        assert_eq!(status.latest.created_at, t0() + Duration::hours(9));
        assert!(!status.is_dc);
        assert_relative_eq!(status.on_time_rate, 18_000.0 / 36_000.0);
        assert_relative_eq!(status.start_count, 4.0);
        assert_relative_eq!(status.energy_usage, 6.5);
    }

    #[test]
    fn test_fewer_than_three_samples_gives_zero_deltas() {
        let samples = vec![
            sample_at(t0() + Duration::hours(1)).on_time(1_000).start_count(10).build(),
            sample_at(t0() + Duration::hours(2)).on_time(4_600).start_count(12).build(),
        ];

        let status = build_status(samples, t0(), t0() + Duration::hours(3)).unwrap();
        assert_eq!(status.latest.record.light_source_on_time, 4_600);
        assert!(status.is_dc);
        assert_relative_eq!(status.on_time_rate, 0.0);
        assert_relative_eq!(status.start_count, 0.0);
        assert_relative_eq!(status.energy_usage, 0.0);
    }

    #[test]
    fn test_no_samples_no_snapshot() {
        assert!(build_status(Vec::new(), t0(), t0()).is_none());
    }

    #[test]
    fn test_snapshot_serializes_flat() {
        let status = build_status(vec![sample_at(t0()).build()], t0(), t0()).unwrap();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["isDC"], true);
        assert!(json.get("light_source_on_time").is_some());
        assert!(json.get("gear_id").is_some());
    }
}
