//! Decoded DALI-2 telemetry record

use serde::{Deserialize, Serialize};

/// One decoded DALI-2 telemetry report.
///
/// Field names follow the gear's memory-bank naming. Unit corrections
/// (voltage, current, temperature, power factor) are already applied when a
/// record leaves [`decode_frame`](crate::acquisition::decode_frame).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    // === Identity ===
    /// Gateway serial, hex of bytes 6..14
    pub serial: String,
    /// Gateway hardware identifier (bytes 14..22, big-endian)
    pub hardware_id: u64,
    /// DALI bus channel on the gateway
    pub channel: u8,
    /// Short address of the gear on the channel
    pub unit: u8,
    pub device_status: u8,
    /// Arc power level. Fractional once a daily reduction has averaged it.
    pub device_arc: f64,

    // === Energy reporting ===
    /// Active energy (Wh)
    pub active_energy: f64,
    /// Active power (W)
    pub active_power: f64,
    /// Apparent energy (VAh)
    pub apparent_energy: f64,
    /// Apparent power (VA)
    pub apparent_power: f64,
    /// Load-side energy (Wh)
    pub loadside_energy: f64,
    /// Load-side power (W)
    pub loadside_power: f64,

    // === Control gear ===
    /// Operating time counter (s)
    pub control_gear_on_time: u32,
    pub control_gear_start_count: u32,
    /// Mains voltage (V)
    pub control_gear_voltage: f64,
    /// Mains frequency (Hz), zero on DC supply
    pub control_gear_voltage_frequence: u8,
    /// Power factor, 0.00 - 1.00
    pub control_gear_power_factor: f64,
    pub control_gear_failure: u8,
    pub control_gear_failure_count: u8,
    pub control_gear_under_voltage: u8,
    pub control_gear_under_voltage_count: u8,
    pub control_gear_over_voltage: u8,
    pub control_gear_over_voltage_count: u8,
    pub control_gear_output_power_limit: u8,
    pub control_gear_output_power_limit_count: u8,
    pub control_gear_thermal_deration: u8,
    pub control_gear_thermal_deration_count: u8,
    pub control_gear_thermal_shutdown: u8,
    pub control_gear_thermal_shutdown_count: u8,
    /// Gear temperature (°C)
    pub control_gear_temperature: i16,
    pub control_gear_output_current_percent: u8,

    // === Light source ===
    pub light_source_start_count_resettable: u32,
    pub light_source_start_count: u32,
    pub light_source_on_time_count_resettable: u32,
    /// Light source operating time counter (s)
    pub light_source_on_time: u32,
    /// Light source voltage (V)
    pub light_source_voltage: f64,
    /// Light source current (A)
    pub light_source_current: f64,
    pub light_source_failure: u8,
    pub light_source_failure_count: u8,
    pub light_source_short: u8,
    pub light_source_short_count: u8,
    pub light_source_open: u8,
    pub light_source_open_count: u8,
    pub light_source_thermal_derating: u8,
    pub light_source_thermal_derating_count: u8,
    pub light_source_thermal_shutdown: u8,
    pub light_source_thermal_shutdown_count: u8,
    /// Light source temperature (°C)
    pub light_source_temperature: i16,
}

impl TelemetryRecord {
    /// `true` when the gear reports no mains frequency.
    pub fn is_dc(&self) -> bool {
        self.control_gear_voltage_frequence == 0
    }
}
