//! Telemetry acquisition module
//!
//! Handles DALI-2 frame decoding and the UDP socket gateways report to.

pub mod bitfield;
pub mod frame;
pub mod udp;

pub use bitfield::{extract_scaled_decimal, extract_uint};
pub use frame::{decode_frame, validate_frame, FrameBuilder, ScaledValue, FIELD_TABLE, MIN_FRAME_LEN};
pub use udp::bind_udp;

use thiserror::Error;

/// Frame decoding errors. Each one is fatal to its frame only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid field length for bytes {start}..={stop} (max {max} bytes)")]
    InvalidFieldLength { start: usize, stop: usize, max: usize },

    #[error("Field bytes {start}..={stop} out of bounds for {len}-byte frame")]
    OutOfBounds { start: usize, stop: usize, len: usize },
}
