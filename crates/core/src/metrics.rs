//! Metrics collection and reporting for a codec instance.
//!
//! Counters cover:
//! - Traffic (bytes packed, hex characters produced, bytes unpacked)
//! - Compression ratio
//! - Rejections (checksum and format failures)
//! - Soft warnings (trailing bits dropped during unpack)
//! - Key installs
//!
//! # Thread Safety
//!
//! `CodecMetrics` is owned by one `Codec` and updated through `&mut self`,
//! like the codec itself. Merge per-thread copies with [`CodecMetrics::merge`].

use std::fmt;

/// Counters for one codec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecMetrics {
    // === Keys ===
    /// Successful key installs (including the implicit default key)
    pub keys_installed: u64,

    /// Key lines rejected across all installs
    pub key_lines_rejected: u64,

    // === Pack ===
    /// Successful pack calls
    pub packs: u64,

    /// Input bytes across successful packs
    pub packed_input_bytes: u64,

    /// Hex characters produced across successful packs
    pub packed_output_chars: u64,

    /// Tokens emitted by the longest-match tokenizer
    pub tokens: u64,

    /// Tokens that matched a multi-byte expression
    pub multi_byte_tokens: u64,

    // === Unpack ===
    /// Successful unpack calls
    pub unpacks: u64,

    /// Bytes produced across successful unpacks
    pub unpacked_bytes: u64,

    /// Unpacks rejected for a checksum mismatch
    pub checksum_failures: u64,

    /// Unpacks rejected for a malformed string
    pub format_failures: u64,

    /// Unpacks that dropped bits ending mid-path
    pub trailing_bit_warnings: u64,
}

impl CodecMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute compression ratio (packed bytes / input bytes).
    ///
    /// Two hex characters carry one byte. Returns 0.0 if nothing was packed.
    pub fn compression_ratio(&self) -> f64 {
        if self.packed_input_bytes == 0 {
            0.0
        } else {
            (self.packed_output_chars as f64 / 2.0) / self.packed_input_bytes as f64
        }
    }

    /// Share of tokens that used a custom multi-byte expression.
    pub fn dictionary_hit_rate(&self) -> f64 {
        if self.tokens == 0 {
            0.0
        } else {
            self.multi_byte_tokens as f64 / self.tokens as f64
        }
    }

    /// Fold another set of counters into this one.
    pub fn merge(&mut self, other: &CodecMetrics) {
        self.keys_installed += other.keys_installed;
        self.key_lines_rejected += other.key_lines_rejected;
        self.packs += other.packs;
        self.packed_input_bytes += other.packed_input_bytes;
        self.packed_output_chars += other.packed_output_chars;
        self.tokens += other.tokens;
        self.multi_byte_tokens += other.multi_byte_tokens;
        self.unpacks += other.unpacks;
        self.unpacked_bytes += other.unpacked_bytes;
        self.checksum_failures += other.checksum_failures;
        self.format_failures += other.format_failures;
        self.trailing_bit_warnings += other.trailing_bit_warnings;
    }
}

/// Human-readable summary.
impl fmt::Display for CodecMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Codec Summary ===")?;
        writeln!(
            f,
            "Keys installed: {} ({} lines rejected)",
            self.keys_installed, self.key_lines_rejected
        )?;
        writeln!(f)?;

        writeln!(f, "=== Pack ===")?;
        writeln!(f, "Calls: {}", self.packs)?;
        writeln!(f, "Input bytes: {}", self.packed_input_bytes)?;
        writeln!(f, "Output hex chars: {}", self.packed_output_chars)?;
        writeln!(f, "Ratio: {:.1}%", self.compression_ratio() * 100.0)?;
        writeln!(
            f,
            "Tokens: {} ({:.1}% dictionary expressions)",
            self.tokens,
            self.dictionary_hit_rate() * 100.0
        )?;
        writeln!(f)?;

        writeln!(f, "=== Unpack ===")?;
        writeln!(f, "Calls: {}", self.unpacks)?;
        writeln!(f, "Output bytes: {}", self.unpacked_bytes)?;
        writeln!(f, "Checksum failures: {}", self.checksum_failures)?;
        writeln!(f, "Format failures: {}", self.format_failures)?;
        write!(f, "Trailing-bit warnings: {}", self.trailing_bit_warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratios_empty() {
        let metrics = CodecMetrics::new();
        assert_eq!(metrics.compression_ratio(), 0.0);
        assert_eq!(metrics.dictionary_hit_rate(), 0.0);
    }

    #[test]
    fn test_compression_ratio() {
        let metrics = CodecMetrics {
            packed_input_bytes: 100,
            packed_output_chars: 120,
            tokens: 80,
            multi_byte_tokens: 20,
            ..CodecMetrics::default()
        };
        assert!((metrics.compression_ratio() - 0.6).abs() < 1e-9);
        assert!((metrics.dictionary_hit_rate() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_merge() {
        let mut a = CodecMetrics {
            packs: 2,
            checksum_failures: 1,
            ..CodecMetrics::default()
        };
        let b = CodecMetrics {
            packs: 3,
            unpacks: 4,
            ..CodecMetrics::default()
        };
        a.merge(&b);
        assert_eq!(a.packs, 5);
        assert_eq!(a.unpacks, 4);
        assert_eq!(a.checksum_failures, 1);
    }

    #[test]
    fn test_summary_mentions_sections() {
        let summary = CodecMetrics::new().to_string();
        assert!(summary.contains("=== Pack ==="));
        assert!(summary.contains("=== Unpack ==="));
    }
}
