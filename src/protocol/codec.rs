//! Argument and label encoding
//!
//! Numeric arguments travel as `'A' + value`. Labels are plain ASCII in the
//! range `'A'..='`'`; digits are escaped as `'^'` followed by an encoded
//! argument.

use crate::error::ProtocolError;

/// Byte that encodes the argument value zero
pub const ARG_ZERO: u8 = b'A';

/// Largest value a numeric argument may carry
pub const ARG_MAX: i32 = 63;

/// Escape byte introducing an encoded digit inside a label
pub const LABEL_ESCAPE: u8 = b'^';

/// Last byte allowed verbatim in a label
const LABEL_MAX: u8 = 0x60;

/// Encode a numeric argument (valid range 0-63)
///
/// No range check happens here: `-1` becomes `'@'` (the dial tone), and
/// anything past the range wraps. Callers validate first.
pub fn encode_arg(value: i32) -> u8 {
    (i32::from(ARG_ZERO) + value) as u8
}

/// Decode a numeric argument; results below zero are meaningful
pub fn decode_arg(byte: u8) -> i32 {
    i32::from(byte) - i32::from(ARG_ZERO)
}

/// Decode an argument that must be non-negative and fit a byte
pub fn decode_unsigned(byte: u8) -> Result<u8, ProtocolError> {
    u8::try_from(decode_arg(byte)).map_err(|_| ProtocolError::ArgumentOutOfRange(byte))
}

/// Encode a label for transmission, dropping characters the device cannot store
pub fn encode_label(label: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(label.len());
    for c in label.chars() {
        if let Some(digit) = c.to_digit(10) {
            out.push(LABEL_ESCAPE);
            out.push(encode_arg(digit as i32));
        } else if c.is_ascii() && (ARG_ZERO..=LABEL_MAX).contains(&(c as u8)) {
            out.push(c as u8);
        }
    }
    out
}

/// Decode a label received from the device
pub fn decode_label(data: &[u8]) -> Result<String, ProtocolError> {
    let mut out = String::with_capacity(data.len());
    let mut bytes = data.iter();
    while let Some(&b) = bytes.next() {
        if b == LABEL_ESCAPE {
            let &digit = bytes.next().ok_or(ProtocolError::DanglingEscape)?;
            out.push_str(&decode_arg(digit).to_string());
        } else {
            out.push(char::from(b));
        }
    }
    Ok(out)
}
