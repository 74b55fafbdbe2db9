//! Weekday and hour-of-day bucketing of counter deltas
//!
//! Each adjacent pair of reduced samples (i, i+1) is attributed to the
//! bucket of sample i. The last sample has no successor and contributes
//! nothing.

use super::calendar::Calendar;
use super::rate::{counter_delta, on_time_rate};
use super::reduce::{reduce_daily, reduce_hourly};
use crate::types::{AggregateBucket, BucketMap, Sample};

/// Days in a week; weekday buckets are keyed 0 (Sunday) to 6.
pub const WEEKDAYS: u8 = 7;
/// Hour-of-day buckets are keyed 0 to 23.
pub const HOURS_PER_DAY: u8 = 24;
/// An hour-of-day profile needs strictly more raw samples than this.
pub const MIN_HOURLY_SAMPLES: usize = 24;

fn empty_buckets(count: u8) -> BucketMap {
    (0..count).map(|key| (key, AggregateBucket::default())).collect()
}

/// Sum the energy and start-count deltas and the on-time rate of one pair.
fn accumulate_pair(bucket: &mut AggregateBucket, current: &Sample, next: &Sample) {
    let (cur, nxt) = (&current.record, &next.record);
    bucket.active_energy += counter_delta(cur.active_energy, nxt.active_energy);
    bucket.apparent_energy += counter_delta(cur.apparent_energy, nxt.apparent_energy);
    bucket.loadside_energy += counter_delta(cur.loadside_energy, nxt.loadside_energy);
    bucket.light_source_start_count += counter_delta(
        f64::from(cur.light_source_start_count),
        f64::from(nxt.light_source_start_count),
    );
    bucket.light_source_on_time += on_time_rate(next, current);
    bucket.pairs += 1;
}

/// Weekday profile over daily-reduced samples.
///
/// Start count and arc are averaged per contributing day pair; on-time rate
/// stays summed. Voltage and frequency are those of the last day attributed
/// to the bucket. Always returns all seven buckets.
pub fn group_by_weekday(samples: Vec<Sample>, calendar: &Calendar) -> BucketMap {
    let days = reduce_daily(samples, calendar);
    let mut buckets = empty_buckets(WEEKDAYS);

    for pair in days.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let bucket = buckets.entry(calendar.weekday(current.created_at)).or_default();
        accumulate_pair(bucket, current, next);
        bucket.control_gear_voltage = current.record.control_gear_voltage;
        bucket.control_gear_voltage_frequence = f64::from(current.record.control_gear_voltage_frequence);
        bucket.device_arc += next.record.device_arc;
    }

    for bucket in buckets.values_mut().filter(|b| b.pairs > 0) {
        let pairs = f64::from(bucket.pairs);
        bucket.light_source_start_count /= pairs;
        bucket.device_arc /= pairs;
    }
    buckets
}

/// Hour-of-day profile over hourly-reduced samples, or `None` with 24 raw
/// samples or fewer.
///
/// On-time rate and arc are divided by the pair count; arc, voltage and
/// frequency are those of the last hour attributed to the bucket, so the
/// arc division applies to a single value.
pub fn group_by_hour_of_day(samples: Vec<Sample>, calendar: &Calendar) -> Option<BucketMap> {
    if samples.len() <= MIN_HOURLY_SAMPLES {
        return None;
    }
    let hours = reduce_hourly(samples, calendar);
    let mut buckets = empty_buckets(HOURS_PER_DAY);

    for pair in hours.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let bucket = buckets.entry(calendar.hour_of_day(current.created_at)).or_default();
        accumulate_pair(bucket, current, next);
        bucket.device_arc = current.record.device_arc;
        bucket.control_gear_voltage = current.record.control_gear_voltage;
        bucket.control_gear_voltage_frequence = f64::from(current.record.control_gear_voltage_frequence);
    }

    for bucket in buckets.values_mut().filter(|b| b.pairs > 0) {
        let pairs = f64::from(bucket.pairs);
        bucket.light_source_on_time /= pairs;
        bucket.device_arc /= pairs;
    }
    Some(buckets)
}
