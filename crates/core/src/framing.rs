//! Packed string framing.
//!
//! A packed payload is printable lowercase hex:
//!
//! # Frame Format
//!
//! ```text
//! +------------------+
//! | pad count (1)    |  '0'..='7': random bits prepended to the codes
//! +------------------+
//! | data nibbles     |  pad bits + code bits, MSB-first, whole bytes
//! | (variable, even) |
//! +------------------+
//! | checksum (1)     |  XOR of every data nibble value
//! +------------------+
//! ```
//!
//! The total is always even: one digit each side of a whole number of
//! bytes. An empty payload frames as `"00"`.
//!
//! # Checksum Coverage
//!
//! Only the data nibbles. The pad count is not covered, and a 4-bit XOR
//! only catches accidental corruption, not tampering.

use crate::error::{Error, FormatError, Result};

/// Frame of an empty payload.
pub const EMPTY_FRAME: &str = "00";

/// Largest pad count (pad bits only ever complete a byte).
pub const MAX_PAD_BITS: u8 = 7;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// A parsed frame: data bytes still carrying their pad bits at the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Number of random bits at the start of `data`
    pub pad_bits: u8,

    /// Pad bits followed by code bits
    pub data: Vec<u8>,

    /// Checksum nibble as received (already verified)
    pub checksum: u8,
}

/// XOR of all nibble values in `data`.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, &b| acc ^ (b >> 4) ^ (b & 0x0f))
}

/// Render `data` (already byte-aligned, pad bits included) as a packed string.
///
/// # Errors
/// `Error::AllocationFailure` if the output cannot be reserved.
pub fn frame_bits(pad_bits: u8, data: &[u8]) -> Result<String> {
    debug_assert!(pad_bits <= MAX_PAD_BITS);

    let mut out = String::new();
    out.try_reserve_exact(data.len() * 2 + 2)?;

    out.push(nibble_char(pad_bits));
    for &b in data {
        out.push(nibble_char(b >> 4));
        out.push(nibble_char(b & 0x0f));
    }
    out.push(nibble_char(checksum(data)));

    Ok(out)
}

/// Parse and validate a packed string.
///
/// # Errors
/// - `FormatError::BadLength` unless the length is even and greater than 2
///   (`"00"` is accepted as the empty frame)
/// - `FormatError::BadPadCount` if the first digit is not `'0'..='7'`
/// - `FormatError::BadHexDigit` for any other non-hex character
/// - `Error::Checksum` if the checksum nibble does not match
pub fn parse_frame(packed: &str) -> Result<Frame> {
    let bytes = packed.as_bytes();

    if packed == EMPTY_FRAME {
        return Ok(Frame {
            pad_bits: 0,
            data: Vec::new(),
            checksum: 0,
        });
    }
    if bytes.len() <= 2 || bytes.len() % 2 != 0 {
        return Err(FormatError::BadLength {
            length: bytes.len(),
        }
        .into());
    }

    let pad_bits = match bytes[0] {
        c @ b'0'..=b'7' => c - b'0',
        _ => {
            return Err(FormatError::BadPadCount {
                found: packed.chars().next().unwrap_or_default(),
            }
            .into())
        }
    };

    let last = bytes.len() - 1;
    let expected = hex_value(packed, last)?;

    let mut data = Vec::new();
    data.try_reserve_exact((last - 1) / 2)?;
    for position in (1..last).step_by(2) {
        let hi = hex_value(packed, position)?;
        let lo = hex_value(packed, position + 1)?;
        data.push(hi << 4 | lo);
    }

    let actual = checksum(&data);
    if actual != expected {
        return Err(Error::Checksum { expected, actual });
    }

    Ok(Frame {
        pad_bits,
        data,
        checksum: expected,
    })
}

fn nibble_char(nibble: u8) -> char {
    HEX_DIGITS[(nibble & 0x0f) as usize] as char
}

/// Value of the hex digit at byte `position`, either case.
fn hex_value(packed: &str, position: usize) -> Result<u8> {
    let b = packed.as_bytes()[position];
    (b as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| {
            FormatError::BadHexDigit {
                position,
                found: packed
                    .get(position..)
                    .and_then(|rest| rest.chars().next())
                    .unwrap_or(char::REPLACEMENT_CHARACTER),
            }
            .into()
        })
}
