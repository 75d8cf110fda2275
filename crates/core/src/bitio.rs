//! Bit-level I/O utilities for reading and writing individual bits.
//!
//! `BitWriter` collects Huffman codes (and the random pad bits in front of
//! them) into bytes; `BitReader` hands them back one bit at a time for the
//! tree walk. Both operate MSB-first, which is also the order in which the
//! packed hex nibbles are rendered.
//!
//! # Padding Rules
//! - BitWriter: pads incomplete bytes with trailing zeros. The codec always
//!   byte-aligns before finishing, so this only matters for direct users.
//! - BitReader: ignores padding bits at the end (caller must track exact bit count)
//!
//! # Example
//! ```
//! use hexpack_core::bitio::{BitWriter, BitReader};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3).unwrap();  // Write 3 bits: 1, 0, 1
//! writer.write_bits(0b11, 2).unwrap();   // Write 2 bits: 1, 1
//! // Total: 10111 -> padded to 10111000
//!
//! let bytes = writer.finish();
//! let mut reader = BitReader::new(&bytes);
//! reader.skip(1).unwrap();
//! assert_eq!(reader.next_bit(), Some(false));
//! assert_eq!(reader.bits_remaining(), 6);
//! ```

use crate::error::{BitIoError, Result};

/// Widest single write, matching the longest possible code.
pub const MAX_BITS_PER_CALL: usize = 128;

/// Writes bits MSB-first into a byte buffer.
///
/// # Invariants
/// - `bit_count` is always < 8
#[derive(Debug, Clone)]
pub struct BitWriter {
    /// Completed bytes
    bytes: Vec<u8>,
    /// Accumulator for the current partial byte (MSB-aligned)
    bit_buffer: u8,
    /// Number of bits in bit_buffer (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// Create a new BitWriter with empty output.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    /// Create a BitWriter with room for `bits` bits.
    ///
    /// # Errors
    /// Returns `Error::AllocationFailure` if the buffer cannot be reserved.
    pub fn with_bit_capacity(bits: usize) -> Result<Self> {
        let mut writer = Self::new();
        writer.bytes.try_reserve_exact(bits.div_ceil(8))?;
        Ok(writer)
    }

    /// Write up to 128 bits to the output.
    ///
    /// Bits are written MSB-first. For example, writing value=0b101 with count=3
    /// writes bits 1, 0, 1 in that order.
    ///
    /// # Errors
    /// Returns `BitIoError::InvalidBitCount` if count > 128.
    pub fn write_bits(&mut self, value: u128, count: usize) -> Result<()> {
        if count > MAX_BITS_PER_CALL {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        let mut remaining = count;
        let mut val = value;

        while remaining > 0 {
            let bits_to_write = remaining.min(8 - self.bit_count as usize);

            // Top bits_to_write bits of what is left
            let shift = remaining - bits_to_write;
            let bits = ((val >> shift) & ((1u128 << bits_to_write) - 1)) as u8;

            self.bit_buffer |= bits << (8 - self.bit_count as usize - bits_to_write);
            self.bit_count += bits_to_write as u8;

            if self.bit_count == 8 {
                self.bytes.push(self.bit_buffer);
                self.bit_buffer = 0;
                self.bit_count = 0;
            }

            val &= (1u128 << shift) - 1;
            remaining -= bits_to_write;
        }

        Ok(())
    }

    /// Finish writing and return the output bytes.
    ///
    /// Any partial byte is padded with trailing zeros.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.bytes.push(self.bit_buffer);
        }
        self.bytes
    }

    /// True when no partial byte is pending.
    pub fn is_aligned(&self) -> bool {
        self.bit_count == 0
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads bits MSB-first from a byte buffer.
///
/// # Invariants
/// - `bit_position` never exceeds `data.len() * 8`
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Current bit position (0 = MSB of first byte)
    bit_position: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new BitReader for the given data.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_position: 0,
        }
    }

    /// Read a single bit, or `None` at the end of the buffer.
    pub fn next_bit(&mut self) -> Option<bool> {
        if self.is_empty() {
            return None;
        }
        let byte = self.data[self.bit_position / 8];
        let bit = (byte >> (7 - self.bit_position % 8)) & 1 == 1;
        self.bit_position += 1;
        Some(bit)
    }

    /// Skip `count` bits.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        if count > self.bits_remaining() {
            return Err(BitIoError::UnexpectedEof.into());
        }
        self.bit_position += count;
        Ok(())
    }

    /// Return the number of bits remaining in the buffer.
    pub fn bits_remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_position
    }

    /// Return the current bit position.
    pub fn position(&self) -> usize {
        self.bit_position
    }

    /// Check if we're at the end of the buffer.
    pub fn is_empty(&self) -> bool {
        self.bit_position >= self.data.len() * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collect `count` bits MSB-first, the way the decoder consumes them.
    fn take_bits(reader: &mut BitReader, count: usize) -> Option<u128> {
        (0..count).try_fold(0u128, |acc, _| Some(acc << 1 | reader.next_bit()? as u128))
    }

    #[test]
    fn test_write_read_partial_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3).unwrap();
        writer.write_bits(0b11, 2).unwrap();
        writer.write_bits(0b000, 3).unwrap();
        assert!(writer.is_aligned());

        let bytes = writer.finish();
        assert_eq!(bytes, vec![0b10111000]);

        let mut reader = BitReader::new(&bytes);
        assert_eq!(take_bits(&mut reader, 3), Some(0b101));
        assert_eq!(take_bits(&mut reader, 2), Some(0b11));
        assert_eq!(take_bits(&mut reader, 3), Some(0b000));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_padding() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1, 1).unwrap();
        assert!(!writer.is_aligned());
        assert_eq!(writer.finish(), vec![0b10000000]);
    }

    #[test]
    fn test_full_width_code() {
        let val = 0x0123_4567_89AB_CDEF_FEDC_BA98_7654_3210u128;
        let mut writer = BitWriter::new();
        writer.write_bits(0b1, 1).unwrap();
        writer.write_bits(val, 128).unwrap();
        assert!(!writer.is_aligned());

        let bytes = writer.finish();
        assert_eq!(bytes.len(), 17);
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.next_bit(), Some(true));
        assert_eq!(take_bits(&mut reader, 128), Some(val));
        assert_eq!(reader.bits_remaining(), 7);
    }

    #[test]
    fn test_too_many_bits() {
        let mut writer = BitWriter::new();
        assert!(writer.write_bits(0, MAX_BITS_PER_CALL + 1).is_err());
    }

    #[test]
    fn test_zero_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0xFF, 0).unwrap();
        assert!(writer.finish().is_empty());

        let mut reader = BitReader::new(&[]);
        assert!(reader.is_empty());
        assert_eq!(reader.next_bit(), None);
    }

    #[test]
    fn test_next_bit_and_skip() {
        let data = [0b1011_0010u8];
        let mut reader = BitReader::new(&data);
        reader.skip(2).unwrap();
        assert_eq!(reader.position(), 2);

        let mut bits = Vec::new();
        while let Some(bit) = reader.next_bit() {
            bits.push(bit);
        }
        assert_eq!(bits, vec![true, true, false, false, true, false]);
        assert!(reader.is_empty());
        assert!(reader.skip(1).is_err());
    }

    #[test]
    fn test_read_past_end() {
        let data = vec![0b10101010];
        let mut reader = BitReader::new(&data);

        assert_eq!(take_bits(&mut reader, 5), Some(0b10101));
        assert_eq!(reader.bits_remaining(), 3);
        assert_eq!(take_bits(&mut reader, 4), None);
        assert!(reader.is_empty());
    }
}
