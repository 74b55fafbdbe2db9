//! Fault event detection

use crate::types::{ErrorPoint, FaultCounter, FaultMaximum, GearId, Sample};

/// Samples at which any light-source fault counter strictly increased over
/// the previous sample, ascending by time. Each sample is reported once,
/// listing every counter that moved.
pub fn find_error_points(mut samples: Vec<Sample>) -> Vec<ErrorPoint> {
    samples.sort_by_key(|s| s.created_at);

    samples
        .windows(2)
        .filter_map(|pair| {
            let (current, next) = (&pair[0].record, &pair[1].record);
            let triggered_by: Vec<FaultCounter> = FaultCounter::ALL
                .into_iter()
                .filter(|counter| counter.read(next) > counter.read(current))
                .collect();
            (!triggered_by.is_empty()).then(|| ErrorPoint {
                sample: pair[1].clone(),
                triggered_by,
            })
        })
        .collect()
}

/// Sample with the highest (light-source, control-gear) failure counts,
/// compared in that order; the latest sample wins ties. `None` when the
/// gear has no samples or both counts are zero.
pub fn max_faults(gear_id: GearId, mut samples: Vec<Sample>) -> Option<FaultMaximum> {
    samples.sort_by_key(|s| s.created_at);

    // max_by_key returns the last of equal maxima
    let peak = samples.iter().max_by_key(|s| {
        (
            s.record.light_source_failure_count,
            s.record.control_gear_failure_count,
        )
    })?;

    let maximum = FaultMaximum {
        gear_id,
        created_at: peak.created_at,
        light_source_failure_count: peak.record.light_source_failure_count,
        control_gear_failure_count: peak.record.control_gear_failure_count,
    };
    (maximum.light_source_failure_count > 0 || maximum.control_gear_failure_count > 0).then_some(maximum)
}
