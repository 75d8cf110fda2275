//! The keyed codec: key install, pack and unpack.
//!
//! A [`Codec`] owns everything derived from the current key (dictionary,
//! tree and code table) as one unit, replaced wholesale by
//! [`Codec::install_key`]. It also owns the random source for pad bits, its
//! metrics and an optional diagnostic sink.
//!
//! # Example
//! ```
//! use hexpack_core::codec::Codec;
//!
//! let mut codec = Codec::with_seed(42);
//! codec.install_key("64226964223a\n3274727565").unwrap();
//!
//! let packed = codec.pack_str("{\"id\":true}").unwrap();
//! assert_eq!(packed.len() % 2, 0);
//! assert_eq!(codec.unpack_str(&packed).unwrap(), "{\"id\":true}");
//! ```

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::bitio::{BitReader, BitWriter};
use crate::codebook::{Code, CodeTable};
use crate::dictionary::{Dictionary, DEFAULT_KEY};
use crate::error::{DictionaryError, Error, FormatError, HuffmanError, Result};
use crate::framing;
use crate::huffman::{HuffmanTree, TreeStats};
use crate::metrics::CodecMetrics;

/// Observable events, delivered to a [`DiagnosticSink`] if one is set.
///
/// These never affect control flow; every failure is also returned as an
/// `Err` from the call that hit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A key took effect
    KeyInstalled {
        custom_entries: usize,
        fingerprint: u32,
    },

    /// A key line was skipped
    KeyLineRejected(DictionaryError),

    /// Unpack discarded bits that ended mid-path
    TrailingBits { count: usize },

    /// Unpack rejected a packet for a checksum mismatch
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// Receiver for [`Diagnostic`] events.
pub trait DiagnosticSink {
    fn record(&mut self, diagnostic: &Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(&Diagnostic),
{
    fn record(&mut self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Outcome of a successful key install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyReport {
    /// Custom entries taken from the key
    pub custom_entries: usize,

    /// Lines that were skipped, in key order
    pub rejected: Vec<DictionaryError>,

    /// CRC-32 of the resulting dictionary
    pub fingerprint: u32,

    /// Shape of the built tree
    pub tree: TreeStats,
}

/// Everything derived from one key.
#[derive(Debug, Clone)]
struct Keyring {
    dictionary: Dictionary,
    tree: HuffmanTree,
    table: CodeTable,
}

/// Keyed pack/unpack codec.
///
/// All operations take `&mut self`: one owner per instance. Share it behind
/// a `Mutex`, or give each thread its own codec with the same key.
pub struct Codec<R = ChaCha8Rng> {
    keyring: Option<Keyring>,
    rng: R,
    metrics: CodecMetrics,
    sink: Option<Box<dyn DiagnosticSink + Send>>,
}

impl Codec<ChaCha8Rng> {
    /// Codec with an entropy-seeded pad-bit source.
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    /// Codec whose pad bits are reproducible from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl Default for Codec<ChaCha8Rng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> Codec<R> {
    /// Codec drawing pad bits from `rng`. No key is installed yet.
    pub fn with_rng(rng: R) -> Self {
        Self {
            keyring: None,
            rng,
            metrics: CodecMetrics::new(),
            sink: None,
        }
    }

    /// Attach a diagnostic sink.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Parse `key`, build the tree and code table, and make them current.
    ///
    /// Rejected lines are listed in the report and do not fail the install.
    ///
    /// # Errors
    /// - `HuffmanError::TreeBuildFailure` / `HuffmanError::CodeTooLong` if
    ///   no usable table comes out of the key
    /// - `Error::AllocationFailure`
    ///
    /// On error the previously installed key stays in effect.
    pub fn install_key(&mut self, key: &str) -> Result<KeyReport> {
        let (dictionary, rejected) = Dictionary::from_key(key)?;
        for line in &rejected {
            warn!(error = %line, "skipping key line");
            self.emit(Diagnostic::KeyLineRejected(line.clone()));
        }

        let tree = HuffmanTree::build(&dictionary)?;
        let table = CodeTable::from_tree(&tree)?;
        self.metrics.key_lines_rejected += rejected.len() as u64;

        let report = KeyReport {
            custom_entries: dictionary.custom_entries().len(),
            rejected,
            fingerprint: dictionary.fingerprint(),
            tree: tree.stats(),
        };
        debug!(
            custom_entries = report.custom_entries,
            fingerprint = report.fingerprint,
            depth = report.tree.depth,
            "installed key"
        );

        self.keyring = Some(Keyring {
            dictionary,
            tree,
            table,
        });
        self.metrics.keys_installed += 1;
        self.emit(Diagnostic::KeyInstalled {
            custom_entries: report.custom_entries,
            fingerprint: report.fingerprint,
        });

        Ok(report)
    }

    /// Compress `input` into a packed hex string.
    ///
    /// Installs the default key first if none is installed.
    ///
    /// # Errors
    /// - `Error::EncodingFailure` if some byte has no code (cannot happen
    ///   with a key-built table, which registers every byte)
    /// - `Error::AllocationFailure`
    pub fn pack(&mut self, input: &[u8]) -> Result<String> {
        self.ensure_key()?;
        let keyring = self.keyring.as_ref().ok_or_else(no_key)?;

        let tokens = tokenize(&keyring.table, input)?;
        let code_bits: usize = tokens.iter().map(|(_, code)| code.len()).sum();
        let pad_bits = (8 - code_bits % 8) % 8;

        let mut writer = BitWriter::with_bit_capacity(pad_bits + code_bits)?;
        let pad_value = self.rng.next_u32() & ((1u32 << pad_bits) - 1);
        writer.write_bits(pad_value as u128, pad_bits)?;
        for (_, code) in &tokens {
            writer.write_bits(code.bits(), code.len())?;
        }
        debug_assert!(writer.is_aligned());

        let packed = framing::frame_bits(pad_bits as u8, &writer.finish())?;

        self.metrics.packs += 1;
        self.metrics.packed_input_bytes += input.len() as u64;
        self.metrics.packed_output_chars += packed.len() as u64;
        self.metrics.tokens += tokens.len() as u64;
        self.metrics.multi_byte_tokens += tokens.iter().filter(|(len, _)| *len > 1).count() as u64;

        Ok(packed)
    }

    /// [`Codec::pack`] for text.
    pub fn pack_str(&mut self, text: &str) -> Result<String> {
        self.pack(text.as_bytes())
    }

    /// Restore the bytes behind a packed string.
    ///
    /// `"00"` unpacks to nothing. Bits left over after the last complete
    /// code are dropped with a warning, not an error.
    ///
    /// # Errors
    /// - `Error::Format` for a bad length, pad digit or hex digit
    /// - `Error::Checksum` if the checksum nibble does not match
    /// - `HuffmanError::TraversalFailure` if the tree is corrupted
    pub fn unpack(&mut self, packed: &str) -> Result<Vec<u8>> {
        let out = self.decode(packed)?;
        self.record_unpack(out.len());
        Ok(out)
    }

    /// [`Codec::unpack`] for text payloads.
    ///
    /// A payload that is not UTF-8 counts as a format failure, not as an
    /// unpack.
    ///
    /// # Errors
    /// As `unpack`, plus `FormatError::InvalidUtf8`.
    pub fn unpack_str(&mut self, packed: &str) -> Result<String> {
        let bytes = self.decode(packed)?;
        match String::from_utf8(bytes) {
            Ok(text) => {
                self.record_unpack(text.len());
                Ok(text)
            }
            Err(_) => {
                self.metrics.format_failures += 1;
                Err(FormatError::InvalidUtf8.into())
            }
        }
    }

    fn record_unpack(&mut self, bytes: usize) {
        self.metrics.unpacks += 1;
        self.metrics.unpacked_bytes += bytes as u64;
    }

    /// Parse and walk a packet without touching the success counters.
    fn decode(&mut self, packed: &str) -> Result<Vec<u8>> {
        self.ensure_key()?;

        let frame = match framing::parse_frame(packed) {
            Ok(frame) => frame,
            Err(e) => {
                self.record_rejection(&e);
                return Err(e);
            }
        };

        let keyring = self.keyring.as_ref().ok_or_else(no_key)?;
        let mut reader = BitReader::new(&frame.data);
        reader.skip(frame.pad_bits as usize)?;

        let mut out = Vec::new();
        let trailing = keyring.tree.decode_into(&mut reader, &mut out)?;

        if trailing > 0 {
            warn!(bits = trailing, "dropping bits after the last complete code");
            self.metrics.trailing_bit_warnings += 1;
            self.emit(Diagnostic::TrailingBits { count: trailing });
        }

        Ok(out)
    }

    /// Current code table (for the diagnostic dump).
    pub fn code_table(&mut self) -> Result<&CodeTable> {
        self.ensure_key()?;
        Ok(&self.installed()?.table)
    }

    /// Current dictionary.
    pub fn dictionary(&mut self) -> Result<&Dictionary> {
        self.ensure_key()?;
        Ok(&self.installed()?.dictionary)
    }

    /// Fingerprint of the current key's dictionary.
    pub fn fingerprint(&mut self) -> Result<u32> {
        Ok(self.dictionary()?.fingerprint())
    }

    /// True once any key (explicit or default) is installed.
    pub fn is_keyed(&self) -> bool {
        self.keyring.is_some()
    }

    pub fn metrics(&self) -> &CodecMetrics {
        &self.metrics
    }

    fn ensure_key(&mut self) -> Result<()> {
        if self.keyring.is_none() {
            debug!("no key installed, using default key");
            self.install_key(DEFAULT_KEY)?;
        }
        Ok(())
    }

    fn installed(&self) -> Result<&Keyring> {
        self.keyring.as_ref().ok_or_else(no_key)
    }

    fn record_rejection(&mut self, error: &Error) {
        match *error {
            Error::Checksum { expected, actual } => {
                warn!(expected, actual, "checksum mismatch");
                self.metrics.checksum_failures += 1;
                self.emit(Diagnostic::ChecksumMismatch { expected, actual });
            }
            Error::Format(ref e) => {
                debug!(error = %e, "malformed packet");
                self.metrics.format_failures += 1;
            }
            _ => {}
        }
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&diagnostic);
        }
    }
}

/// Longest-match-first tokenization: `(matched length, code)` per token.
fn tokenize<'t>(table: &'t CodeTable, input: &[u8]) -> Result<Vec<(usize, &'t Code)>> {
    let mut tokens = Vec::new();
    tokens.try_reserve(input.len())?;

    let mut position = 0;
    while position < input.len() {
        let (len, code) = table
            .longest_match(&input[position..])
            .ok_or(Error::EncodingFailure {
                position,
                byte: input[position],
            })?;
        tokens.push((len, code));
        position += len;
    }

    Ok(tokens)
}

fn no_key() -> Error {
    HuffmanError::TreeBuildFailure("no key installed").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_default_key_installed_lazily() {
        let mut codec = Codec::with_seed(1);
        assert!(!codec.is_keyed());

        let packed = codec.pack_str("true").unwrap();
        assert!(codec.is_keyed());
        assert_eq!(codec.metrics().keys_installed, 1);
        assert_eq!(codec.metrics().tokens, 1);
        assert_eq!(codec.unpack_str(&packed).unwrap(), "true");
    }

    #[test]
    fn test_empty_payload() {
        let mut codec = Codec::with_seed(1);
        assert_eq!(codec.pack(b"").unwrap(), "00");
        assert!(codec.unpack("00").unwrap().is_empty());
    }

    #[test]
    fn test_seeded_output_is_reproducible() {
        let mut a = Codec::with_seed(99);
        let mut b = Codec::with_seed(99);
        for text in ["hello", "false,\\n", "x"] {
            assert_eq!(a.pack_str(text).unwrap(), b.pack_str(text).unwrap());
        }
    }

    #[test]
    fn test_output_is_lowercase_even_hex() {
        let mut codec = Codec::with_seed(5);
        let packed = codec.pack(&[0x00, 0xff, b'Z', b'\n']).unwrap();
        assert_eq!(packed.len() % 2, 0);
        assert!(packed
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert!(('0'..='7').contains(&packed.chars().next().unwrap()));
    }

    #[test]
    fn test_install_replaces_previous_key() {
        let mut codec = Codec::with_seed(3);
        codec.install_key("64226964223a").unwrap();
        let before = codec.fingerprint().unwrap();
        assert!(codec.code_table().unwrap().get(b"\"id\":").is_some());

        let report = codec.install_key("zz\n01").unwrap();
        assert_eq!(report.custom_entries, 0);
        assert_eq!(report.rejected.len(), 2);
        assert_ne!(codec.fingerprint().unwrap(), before);
        assert!(codec.code_table().unwrap().get(b"\"id\":").is_none());
    }

    #[test]
    fn test_rejected_lines_counted_with_the_install() {
        let mut codec = Codec::with_seed(4);
        codec.install_key("zz\n01\n3274727565").unwrap();
        assert_eq!(codec.metrics().keys_installed, 1);
        assert_eq!(codec.metrics().key_lines_rejected, 2);

        codec.install_key("\n3266616c7365").unwrap();
        assert_eq!(codec.metrics().keys_installed, 2);
        assert_eq!(codec.metrics().key_lines_rejected, 3);
    }

    #[test]
    fn test_invalid_utf8_is_not_counted_as_unpack() {
        let mut codec = Codec::with_seed(6);
        let packed = codec.pack(&[b'a', 0xff]).unwrap();

        assert!(matches!(
            codec.unpack_str(&packed),
            Err(Error::Format(FormatError::InvalidUtf8))
        ));
        assert_eq!(codec.metrics().unpacks, 0);
        assert_eq!(codec.metrics().unpacked_bytes, 0);
        assert_eq!(codec.metrics().format_failures, 1);

        assert_eq!(codec.unpack(&packed).unwrap(), vec![b'a', 0xff]);
        assert_eq!(codec.metrics().unpacks, 1);
        assert_eq!(codec.metrics().unpacked_bytes, 2);
        assert_eq!(codec.metrics().format_failures, 1);
    }

    #[test]
    fn test_sink_receives_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        let mut codec = Codec::with_seed(8).with_sink(move |d: &Diagnostic| {
            captured.lock().unwrap().push(d.clone());
        });

        codec.install_key("6\n3274727565").unwrap();
        let packed = codec.pack_str("true").unwrap();

        // Corrupt the checksum digit
        let mut corrupted = packed[..packed.len() - 1].to_string();
        let last = packed.chars().last().unwrap();
        corrupted.push(if last == '0' { '1' } else { '0' });
        assert!(codec.unpack(&corrupted).is_err());

        let events = events.lock().unwrap();
        assert!(matches!(
            events[0],
            Diagnostic::KeyLineRejected(DictionaryError::InvalidExpressionLine { line: 1, .. })
        ));
        assert!(matches!(
            events[1],
            Diagnostic::KeyInstalled { custom_entries: 1, .. }
        ));
        assert!(matches!(events[2], Diagnostic::ChecksumMismatch { .. }));
        assert_eq!(codec.metrics().checksum_failures, 1);
    }

    #[test]
    fn test_trailing_bits_are_a_warning() {
        let mut codec = Codec::with_seed(2);
        let table = codec.code_table().unwrap().clone();
        let shortest = table.entries().iter().map(|(_, c)| c.len()).min().unwrap();
        assert!(shortest > 1);

        // code for 'e' followed by one bit that cannot finish another code
        let code = *table.get(b"e").unwrap();
        let pad = (8 - (code.len() + 1) % 8) % 8;
        let mut writer = BitWriter::new();
        writer.write_bits(0, pad).unwrap();
        writer.write_bits(code.bits(), code.len()).unwrap();
        writer.write_bits(0, 1).unwrap();
        let packed = framing::frame_bits(pad as u8, &writer.finish()).unwrap();

        assert_eq!(codec.unpack(&packed).unwrap(), b"e");
        assert_eq!(codec.metrics().trailing_bit_warnings, 1);
    }
}
