//! DALI-2 Telemetry Frame Decoder
//!
//! Gateways broadcast one UDP datagram per gear per reporting interval:
//!
//! ```text
//! [0..6)    "DALI-2" magic
//! [6..14)   gateway serial (shown as hex)
//! [14..22)  gateway hardware id, u64 big-endian
//! [22]      channel          [23] unit
//! [26]      device status    [27] device arc
//! [41..79)  energy / power pairs (scaled decimals)
//! [80..105) control gear bank
//! [106..135) light source bank
//! ```
//!
//! Offsets below are the gateway firmware's layout and must not drift.

use super::bitfield::{extract_hex, extract_scaled_decimal, extract_u64, extract_uint};
use super::DecodeError;
use crate::types::TelemetryRecord;

/// Frame header magic.
pub const FRAME_MAGIC: &[u8; 6] = b"DALI-2";

/// Smallest datagram that carries every field.
pub const MIN_FRAME_LEN: usize = 140;

/// Identity offsets
pub mod offsets {
    pub const SERIAL: (usize, usize) = (6, 13);
    pub const HARDWARE_ID: usize = 14;
    pub const CHANNEL: usize = 22;
    pub const UNIT: usize = 23;
    pub const DEVICE_STATUS: usize = 26;
    pub const DEVICE_ARC: usize = 27;
}

/// How a field is laid out on the wire and where it lands in the record.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// Single byte
    Byte(fn(&mut TelemetryRecord, u8)),
    /// Big-endian unsigned integer, 1 to 4 bytes
    UInt(fn(&mut TelemetryRecord, u32)),
    /// Exponent byte followed by a mantissa
    Scaled(fn(&mut TelemetryRecord, f64)),
}

/// One row of the wire layout.
#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub start: usize,
    pub stop: usize,
    pub kind: FieldKind,
}

const fn byte(name: &'static str, at: usize, set: fn(&mut TelemetryRecord, u8)) -> FieldSpec {
    FieldSpec {
        name,
        start: at,
        stop: at,
        kind: FieldKind::Byte(set),
    }
}

const fn uint(
    name: &'static str,
    start: usize,
    stop: usize,
    set: fn(&mut TelemetryRecord, u32),
) -> FieldSpec {
    FieldSpec {
        name,
        start,
        stop,
        kind: FieldKind::UInt(set),
    }
}

const fn scaled(
    name: &'static str,
    start: usize,
    stop: usize,
    set: fn(&mut TelemetryRecord, f64),
) -> FieldSpec {
    FieldSpec {
        name,
        start,
        stop,
        kind: FieldKind::Scaled(set),
    }
}

/// Measurement fields, in wire order.
pub const FIELD_TABLE: &[FieldSpec] = &[
    byte("device_status", offsets::DEVICE_STATUS, |r, v| r.device_status = v),
    byte("device_arc", offsets::DEVICE_ARC, |r, v| r.device_arc = f64::from(v)),
    scaled("active_energy", 41, 47, |r, v| r.active_energy = v),
    scaled("active_power", 48, 52, |r, v| r.active_power = v),
    scaled("apparent_energy", 54, 60, |r, v| r.apparent_energy = v),
    scaled("apparent_power", 61, 65, |r, v| r.apparent_power = v),
    scaled("loadside_energy", 67, 73, |r, v| r.loadside_energy = v),
    scaled("loadside_power", 74, 78, |r, v| r.loadside_power = v),
    // Control gear bank
    uint("control_gear_on_time", 80, 83, |r, v| r.control_gear_on_time = v),
    uint("control_gear_start_count", 84, 86, |r, v| r.control_gear_start_count = v),
    uint("control_gear_voltage", 87, 88, |r, v| r.control_gear_voltage = f64::from(v)),
    byte("control_gear_voltage_frequence", 89, |r, v| r.control_gear_voltage_frequence = v),
    byte("control_gear_power_factor", 90, |r, v| r.control_gear_power_factor = f64::from(v)),
    byte("control_gear_failure", 91, |r, v| r.control_gear_failure = v),
    byte("control_gear_failure_count", 92, |r, v| r.control_gear_failure_count = v),
    byte("control_gear_under_voltage", 93, |r, v| r.control_gear_under_voltage = v),
    byte("control_gear_under_voltage_count", 94, |r, v| r.control_gear_under_voltage_count = v),
    byte("control_gear_over_voltage", 95, |r, v| r.control_gear_over_voltage = v),
    byte("control_gear_over_voltage_count", 96, |r, v| r.control_gear_over_voltage_count = v),
    byte("control_gear_output_power_limit", 97, |r, v| r.control_gear_output_power_limit = v),
    byte("control_gear_output_power_limit_count", 98, |r, v| {
        r.control_gear_output_power_limit_count = v;
    }),
    byte("control_gear_thermal_deration", 99, |r, v| r.control_gear_thermal_deration = v),
    byte("control_gear_thermal_deration_count", 100, |r, v| {
        r.control_gear_thermal_deration_count = v;
    }),
    byte("control_gear_thermal_shutdown", 101, |r, v| r.control_gear_thermal_shutdown = v),
    byte("control_gear_thermal_shutdown_count", 102, |r, v| {
        r.control_gear_thermal_shutdown_count = v;
    }),
    byte("control_gear_temperature", 103, |r, v| r.control_gear_temperature = i16::from(v)),
    byte("control_gear_output_current_percent", 104, |r, v| {
        r.control_gear_output_current_percent = v;
    }),
    // Light source bank
    uint("light_source_start_count_resettable", 106, 108, |r, v| {
        r.light_source_start_count_resettable = v;
    }),
    uint("light_source_start_count", 109, 111, |r, v| r.light_source_start_count = v),
    uint("light_source_on_time_count_resettable", 112, 115, |r, v| {
        r.light_source_on_time_count_resettable = v;
    }),
    uint("light_source_on_time", 116, 119, |r, v| r.light_source_on_time = v),
    uint("light_source_voltage", 120, 121, |r, v| r.light_source_voltage = f64::from(v)),
    uint("light_source_current", 122, 123, |r, v| r.light_source_current = f64::from(v)),
    byte("light_source_failure", 124, |r, v| r.light_source_failure = v),
    byte("light_source_failure_count", 125, |r, v| r.light_source_failure_count = v),
    byte("light_source_short", 126, |r, v| r.light_source_short = v),
    byte("light_source_short_count", 127, |r, v| r.light_source_short_count = v),
    byte("light_source_open", 128, |r, v| r.light_source_open = v),
    byte("light_source_open_count", 129, |r, v| r.light_source_open_count = v),
    byte("light_source_thermal_derating", 130, |r, v| r.light_source_thermal_derating = v),
    byte("light_source_thermal_derating_count", 131, |r, v| {
        r.light_source_thermal_derating_count = v;
    }),
    byte("light_source_thermal_shutdown", 132, |r, v| r.light_source_thermal_shutdown = v),
    byte("light_source_thermal_shutdown_count", 133, |r, v| {
        r.light_source_thermal_shutdown_count = v;
    }),
    byte("light_source_temperature", 134, |r, v| r.light_source_temperature = i16::from(v)),
];

/// Temperatures are reported with a +60 °C bias.
const TEMPERATURE_BIAS: i16 = 60;

/// Check magic and length without decoding.
pub fn validate_frame(frame: &[u8]) -> Result<(), DecodeError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(DecodeError::InvalidFrame(format!(
            "{} bytes, minimum is {MIN_FRAME_LEN}",
            frame.len()
        )));
    }
    if &frame[..FRAME_MAGIC.len()] != FRAME_MAGIC {
        return Err(DecodeError::InvalidFrame(format!(
            "header {:?} is not DALI-2",
            String::from_utf8_lossy(&frame[..FRAME_MAGIC.len()])
        )));
    }
    Ok(())
}

/// Decode a raw datagram into a unit-corrected [`TelemetryRecord`].
pub fn decode_frame(frame: &[u8]) -> Result<TelemetryRecord, DecodeError> {
    validate_frame(frame)?;

    let mut record = TelemetryRecord {
        serial: extract_hex(frame, offsets::SERIAL.0, offsets::SERIAL.1)?,
        hardware_id: extract_u64(frame, offsets::HARDWARE_ID)?,
        channel: frame[offsets::CHANNEL],
        unit: frame[offsets::UNIT],
        ..TelemetryRecord::default()
    };

    for field in FIELD_TABLE {
        match field.kind {
            FieldKind::Byte(set) => set(&mut record, frame[field.start]),
            FieldKind::UInt(set) => set(&mut record, extract_uint(frame, field.start, field.stop)?),
            FieldKind::Scaled(set) => {
                set(&mut record, extract_scaled_decimal(frame, field.start, field.stop)?);
            }
        }
    }

    apply_corrections(&mut record);
    Ok(record)
}

/// Convert raw register values to engineering units. Called once per decode.
fn apply_corrections(record: &mut TelemetryRecord) {
    record.control_gear_voltage /= 10.0;
    record.light_source_voltage /= 10.0;
    record.light_source_current /= 1000.0;
    record.control_gear_temperature -= TEMPERATURE_BIAS;
    record.light_source_temperature -= TEMPERATURE_BIAS;
    record.control_gear_power_factor /= 100.0;
}

/// Field values for [`FrameBuilder`], expressed as raw wire values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaledValue {
    pub exponent: i8,
    pub mantissa: i64,
}

/// DALI-2 frame builder (for testing/replay)
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    buf: Vec<u8>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        let mut buf = vec![0u8; MIN_FRAME_LEN];
        buf[..FRAME_MAGIC.len()].copy_from_slice(FRAME_MAGIC);
        Self { buf }
    }

    pub fn serial(&mut self, serial: u64) -> &mut Self {
        self.buf[offsets::SERIAL.0..=offsets::SERIAL.1].copy_from_slice(&serial.to_be_bytes());
        self
    }

    pub fn gear(&mut self, hardware_id: u64, channel: u8, unit: u8) -> &mut Self {
        let at = offsets::HARDWARE_ID;
        self.buf[at..at + 8].copy_from_slice(&hardware_id.to_be_bytes());
        self.buf[offsets::CHANNEL] = channel;
        self.buf[offsets::UNIT] = unit;
        self
    }

    /// Set a single byte at `offset`.
    pub fn byte(&mut self, offset: usize, value: u8) -> &mut Self {
        self.buf[offset] = value;
        self
    }

    /// Write `value` big-endian into `start..=stop`.
    pub fn uint(&mut self, start: usize, stop: usize, value: u32) -> &mut Self {
        let width = stop - start + 1;
        let bytes = value.to_be_bytes();
        self.buf[start..=stop].copy_from_slice(&bytes[bytes.len() - width..]);
        self
    }

    /// Write an exponent byte at `start` and the mantissa into `start+1..=stop`.
    pub fn scaled(&mut self, start: usize, stop: usize, value: ScaledValue) -> &mut Self {
        let width = stop - start;
        self.buf[start] = value.exponent.to_be_bytes()[0];
        let bytes = value.mantissa.to_be_bytes();
        self.buf[start + 1..=stop].copy_from_slice(&bytes[bytes.len() - width..]);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.buf.clone()
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Vec<u8> {
        FrameBuilder::new()
            .serial(0x0011_2233_4455_6677)
            .gear(0xdead_beef, 2, 17)
            .byte(offsets::DEVICE_STATUS, 4)
            .byte(offsets::DEVICE_ARC, 254)
            .scaled(41, 47, ScaledValue { exponent: 0, mantissa: 123_456 })
            .scaled(48, 52, ScaledValue { exponent: -1, mantissa: 1234 })
            .scaled(54, 60, ScaledValue { exponent: 1, mantissa: 42 })
            .uint(80, 83, 3_600)
            .uint(84, 86, 77)
            .uint(87, 88, 2301)
            .byte(89, 50)
            .byte(90, 95)
            .byte(103, 85)
            .uint(109, 111, 12)
            .uint(116, 119, 7_200)
            .uint(120, 121, 481)
            .uint(122, 123, 350)
            .byte(125, 3)
            .byte(134, 100)
            .build()
    }

    #[test]
    fn test_decode_identity() {
        let record = decode_frame(&sample_frame()).unwrap();
        assert_eq!(record.serial, "0011223344556677");
        assert_eq!(record.hardware_id, 0xdead_beef);
        assert_eq!(record.channel, 2);
        assert_eq!(record.unit, 17);
        assert_eq!(record.device_status, 4);
        assert_eq!(record.device_arc, 254.0);
    }

    #[test]
    fn test_decode_measurements_and_corrections() {
        let record = decode_frame(&sample_frame()).unwrap();

        assert_eq!(record.active_energy, 123_456.0);
        assert_eq!(record.active_power, 123.4);
        assert_eq!(record.apparent_energy, 420.0);
        assert_eq!(record.control_gear_on_time, 3_600);
        assert_eq!(record.control_gear_start_count, 77);
        assert_eq!(record.control_gear_voltage, 230.1);
        assert_eq!(record.control_gear_voltage_frequence, 50);
        assert_eq!(record.control_gear_power_factor, 0.95);
        assert_eq!(record.control_gear_temperature, 25);
        assert_eq!(record.light_source_start_count, 12);
        assert_eq!(record.light_source_on_time, 7_200);
        assert_eq!(record.light_source_voltage, 48.1);
        assert_eq!(record.light_source_current, 0.35);
        assert_eq!(record.light_source_failure_count, 3);
        assert_eq!(record.light_source_temperature, 40);
    }

    #[test]
    fn test_start_count_ignores_on_time_byte() {
        // Byte 83 belongs to the on-time counter, not the start count
        let frame = FrameBuilder::new().uint(80, 83, 0xffff_ffff).uint(84, 86, 5).build();
        let record = decode_frame(&frame).unwrap();
        assert_eq!(record.control_gear_start_count, 5);
        assert_eq!(record.control_gear_on_time, u32::MAX);
    }

    #[test]
    fn test_cold_gear_temperature_goes_negative() {
        let frame = FrameBuilder::new().byte(103, 40).byte(134, 0).build();
        let record = decode_frame(&frame).unwrap();
        assert_eq!(record.control_gear_temperature, -20);
        assert_eq!(record.light_source_temperature, -60);
    }

    #[test]
    fn test_rejects_short_frame() {
        let mut frame = sample_frame();
        frame.truncate(MIN_FRAME_LEN - 1);
        assert!(matches!(decode_frame(&frame), Err(DecodeError::InvalidFrame(_))));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut frame = sample_frame();
        frame[..6].copy_from_slice(b"DALI-1");
        assert!(matches!(decode_frame(&frame), Err(DecodeError::InvalidFrame(_))));
    }

    #[test]
    fn test_accepts_trailing_bytes() {
        let mut frame = sample_frame();
        frame.extend_from_slice(&[0xaa; 20]);
        assert!(decode_frame(&frame).is_ok());
    }

    #[test]
    fn test_field_table_fits_minimum_frame() {
        for field in FIELD_TABLE {
            assert!(field.start <= field.stop, "{} has inverted span", field.name);
            assert!(field.stop < MIN_FRAME_LEN, "{} overruns the frame", field.name);
        }
    }
}
