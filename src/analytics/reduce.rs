//! Daily and hourly reduction of a single gear's samples
//!
//! Both functions sort their input themselves; callers may pass samples in
//! any order.

use super::calendar::Calendar;
use crate::types::Sample;

/// One sample per calendar day: the latest of the day, with `device_arc`
/// replaced by the mean arc of that day. Returned ascending by time.
///
/// Lists shorter than two pass through unchanged. Idempotent.
pub fn reduce_daily(mut samples: Vec<Sample>, calendar: &Calendar) -> Vec<Sample> {
    if samples.len() < 2 {
        return samples;
    }
    samples.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut days: Vec<Sample> = Vec::new();
    let mut arc_sum = 0.0;
    let mut arc_count = 0u32;

    for sample in samples {
        let same_day = days
            .last()
            .is_some_and(|rep| calendar.day_of(rep.created_at) == calendar.day_of(sample.created_at));
        if same_day {
            arc_sum += sample.record.device_arc;
            arc_count += 1;
            continue;
        }
        close_day(&mut days, arc_sum, arc_count);
        arc_sum = sample.record.device_arc;
        arc_count = 1;
        days.push(sample);
    }
    close_day(&mut days, arc_sum, arc_count);

    days.sort_by_key(|s| s.created_at);
    days
}

fn close_day(days: &mut [Sample], arc_sum: f64, arc_count: u32) {
    if let Some(rep) = days.last_mut() {
        if arc_count > 0 {
            rep.record.device_arc = arc_sum / f64::from(arc_count);
        }
    }
}

/// One sample per clock hour: the earliest of the hour, unchanged.
/// Returned ascending by time.
pub fn reduce_hourly(mut samples: Vec<Sample>, calendar: &Calendar) -> Vec<Sample> {
    if samples.len() < 2 {
        return samples;
    }
    samples.sort_by_key(|s| s.created_at);
    samples.dedup_by_key(|s| calendar.hour_slot(s.created_at));
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::{sample_at, t0};
    use approx::assert_relative_eq;
    use chrono::Duration;

    #[test]
    fn test_daily_keeps_latest_and_averages_arc() {
        let cal = Calendar::utc();
        let samples = vec![
            sample_at(t0() + Duration::hours(1)).arc(100.0).energy(1.0).build(),
            sample_at(t0() + Duration::hours(9)).arc(200.0).energy(2.0).build(),
            sample_at(t0() + Duration::hours(5)).arc(150.0).energy(1.5).build(),
            sample_at(t0() + Duration::days(1)).arc(40.0).energy(3.0).build(),
        ];

        let days = reduce_daily(samples, &cal);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].created_at, t0() + Duration::hours(9));
        assert_relative_eq!(days[0].record.device_arc, 150.0);
        assert_relative_eq!(days[0].record.active_energy, 2.0);
        assert_relative_eq!(days[1].record.device_arc, 40.0);
    }

    #[test]
    fn test_daily_is_idempotent() {
        let cal = Calendar::utc();
        let samples: Vec<_> = (0..40)
            .map(|h| sample_at(t0() + Duration::hours(h * 3)).arc((h * 7 % 254) as f64).build())
            .collect();

        let once = reduce_daily(samples, &cal);
        let twice = reduce_daily(once.clone(), &cal);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_daily_short_input_passes_through() {
        let cal = Calendar::utc();
        let single = vec![sample_at(t0()).arc(17.0).build()];
        assert_eq!(reduce_daily(single.clone(), &cal), single);
        assert!(reduce_daily(Vec::new(), &cal).is_empty());
    }

    #[test]
    fn test_hourly_keeps_first_of_each_hour() {
        let cal = Calendar::utc();
        let samples = vec![
            sample_at(t0() + Duration::minutes(50)).arc(3.0).build(),
            sample_at(t0() + Duration::minutes(10)).arc(1.0).build(),
            sample_at(t0() + Duration::minutes(70)).arc(4.0).build(),
            sample_at(t0() + Duration::minutes(30)).arc(2.0).build(),
        ];

        let hours = reduce_hourly(samples, &cal);
        let arcs: Vec<_> = hours.iter().map(|s| s.record.device_arc).collect();
        assert_eq!(arcs, vec![1.0, 4.0]);
    }

    #[test]
    fn test_hourly_separates_same_hour_on_different_days() {
        let cal = Calendar::utc();
        let samples = vec![
            sample_at(t0() + Duration::minutes(5)).build(),
            sample_at(t0() + Duration::days(1) + Duration::minutes(5)).build(),
        ];
        assert_eq!(reduce_hourly(samples, &cal).len(), 2);
    }
}
