//! Bit-field extraction primitives for DALI-2 memory-bank dumps
//!
//! Offsets are inclusive byte positions (`start..=stop`) into the raw frame.

use super::DecodeError;

/// Widest unsigned integer field on the wire.
pub const MAX_UINT_BYTES: usize = 4;

/// Widest scaled-decimal mantissa.
pub const MAX_MANTISSA_BYTES: usize = 8;

/// Read a big-endian unsigned integer spanning `start..=stop` (1 to 4 bytes).
pub fn extract_uint(buf: &[u8], start: usize, stop: usize) -> Result<u32, DecodeError> {
    if stop < start || stop - start + 1 > MAX_UINT_BYTES {
        return Err(DecodeError::InvalidFieldLength {
            start,
            stop,
            max: MAX_UINT_BYTES,
        });
    }

    let bytes = field_bytes(buf, start, stop)?;
    Ok(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

/// Read a scaled decimal: `buf[start]` is a signed power-of-ten exponent and
/// `start+1..=stop` a big-endian mantissa of 1 to 8 bytes.
///
/// Non-negative exponents multiply. Negative exponents shift the decimal
/// point in the mantissa's digit string and parse the result, which keeps
/// values like `123.4` exact where `1234.0 * 10^-1` would not be.
pub fn extract_scaled_decimal(buf: &[u8], start: usize, stop: usize) -> Result<f64, DecodeError> {
    let mantissa_len = stop.saturating_sub(start);
    if mantissa_len == 0 || mantissa_len > MAX_MANTISSA_BYTES {
        return Err(DecodeError::InvalidFieldLength {
            start,
            stop,
            max: MAX_MANTISSA_BYTES,
        });
    }

    let bytes = field_bytes(buf, start, stop)?;
    let exponent = i8::from_be_bytes([bytes[0]]);

    let mut padded = [0u8; MAX_MANTISSA_BYTES];
    padded[MAX_MANTISSA_BYTES - mantissa_len..].copy_from_slice(&bytes[1..]);
    let mantissa = i64::from_be_bytes(padded);

    if exponent >= 0 {
        #[allow(clippy::cast_precision_loss)]
        return Ok(mantissa as f64 * 10f64.powi(i32::from(exponent)));
    }

    Ok(shift_decimal_point(mantissa, exponent.unsigned_abs()))
}

/// Insert a decimal point `shift` digits from the right of `mantissa`.
///
/// When the mantissa has no more digits than `shift`, the fraction is padded
/// with leading zeros (`5` shifted by 3 is `0.005`).
fn shift_decimal_point(mantissa: i64, shift: u8) -> f64 {
    let digits = mantissa.unsigned_abs().to_string();
    let shift = usize::from(shift);

    let text = if digits.len() > shift {
        let (int_part, frac_part) = digits.split_at(digits.len() - shift);
        format!("{int_part}.{frac_part}")
    } else {
        format!("0.{}{digits}", "0".repeat(shift - digits.len()))
    };

    // Built from ASCII digits only, parsing cannot fail.
    let value = text.parse::<f64>().unwrap_or_default();
    if mantissa < 0 {
        -value
    } else {
        value
    }
}

/// Read a big-endian `u64` spanning `start..start + 8`.
pub fn extract_u64(buf: &[u8], start: usize) -> Result<u64, DecodeError> {
    let bytes = field_bytes(buf, start, start + 7)?;
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    Ok(u64::from_be_bytes(word))
}

/// Lower-case hex rendering of `start..=stop`.
pub fn extract_hex(buf: &[u8], start: usize, stop: usize) -> Result<String, DecodeError> {
    field_bytes(buf, start, stop).map(hex::encode)
}

fn field_bytes(buf: &[u8], start: usize, stop: usize) -> Result<&[u8], DecodeError> {
    buf.get(start..=stop).ok_or(DecodeError::OutOfBounds {
        start,
        stop,
        len: buf.len(),
    })
}
