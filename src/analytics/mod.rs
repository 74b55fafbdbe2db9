//! Analytics engine
//!
//! Turns irregularly sampled, monotonic-counter telemetry into daily,
//! hour-of-day and weekday views, fault events and live status.
//!
//! - `reduce`: one sample per day / per hour
//! - `buckets`: weekday and hour-of-day delta profiles
//! - `rate`: counter deltas and the on-time rate formula
//! - `faults`: fault event detection and per-gear maxima
//! - `status`: live snapshot since local midnight
//! - `service`: store-backed entry points for the API

pub mod buckets;
pub mod calendar;
pub mod faults;
pub mod rate;
pub mod reduce;
pub mod service;
pub mod status;

pub use buckets::{group_by_hour_of_day, group_by_weekday};
pub use calendar::Calendar;
pub use faults::{find_error_points, max_faults};
pub use rate::{counter_delta, on_time_rate};
pub use reduce::{reduce_daily, reduce_hourly};
pub use service::{AnalyticsError, AnalyticsService, GearSamples};
pub use status::build_status;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::types::{FaultCounter, GearId, Sample, TelemetryRecord};

    /// Monday 2024-03-04 00:00 UTC
    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
    }

    pub fn sample_at(at: DateTime<Utc>) -> SampleBuilder {
        SampleBuilder {
            gear_id: GearId(1),
            at,
            record: TelemetryRecord::default(),
        }
    }

    pub struct SampleBuilder {
        gear_id: GearId,
        at: DateTime<Utc>,
        record: TelemetryRecord,
    }

    impl SampleBuilder {
        pub fn gear(mut self, id: u64) -> Self {
            self.gear_id = GearId(id);
            self
        }

        /// Sets all three energy counters.
        pub fn energy(mut self, value: f64) -> Self {
            self.record.active_energy = value;
            self.record.apparent_energy = value;
            self.record.loadside_energy = value;
            self
        }

        pub fn apparent(mut self, value: f64) -> Self {
            self.record.apparent_energy = value;
            self
        }

        pub fn on_time(mut self, value: u32) -> Self {
            self.record.light_source_on_time = value;
            self
        }

        pub fn start_count(mut self, value: u32) -> Self {
            self.record.light_source_start_count = value;
            self
        }

        pub fn arc(mut self, value: f64) -> Self {
            self.record.device_arc = value;
            self
        }

        pub fn voltage(mut self, value: f64) -> Self {
            self.record.control_gear_voltage = value;
            self
        }

        pub fn frequency(mut self, value: u8) -> Self {
            self.record.control_gear_voltage_frequence = value;
            self
        }

        pub fn fault(mut self, counter: FaultCounter, value: u8) -> Self {
            let field = match counter {
                FaultCounter::LightSourceFailureCount => &mut self.record.light_source_failure_count,
                FaultCounter::LightSourceOpenCount => &mut self.record.light_source_open_count,
                FaultCounter::LightSourceShortCount => &mut self.record.light_source_short_count,
                FaultCounter::LightSourceThermalShutdownCount => {
                    &mut self.record.light_source_thermal_shutdown_count
                }
                FaultCounter::LightSourceThermalDeratingCount => {
                    &mut self.record.light_source_thermal_derating_count
                }
            };
            *field = value;
            self
        }

        pub fn cg_failures(mut self, value: u8) -> Self {
            self.record.control_gear_failure_count = value;
            self
        }

        pub fn build(self) -> Sample {
            Sample::new(self.gear_id, self.at, self.record)
        }
    }
}
