//! Key parsing and the weighted symbol table.
//!
//! A key is newline-separated hexadecimal text. Each line holds one weight
//! byte followed by up to [`MAX_EXPRESSION_LENGTH`] expression bytes:
//!
//! ```text
//! 64226964223a      weight 100, expression "id":
//! 3274727565        weight 50,  expression true
//! ```
//!
//! After the custom lines, every byte value 0x00..=0xFF is registered as a
//! single-byte entry with a fixed heuristic weight, so any input stays
//! encodable whatever the key says.
//!
//! Entry order matters: the tree builder breaks weight ties by position,
//! so custom entries come first (in key order), then bytes in ascending order.

use std::fmt;

use crate::error::{DictionaryError, Result};

/// Longest expression a key line may register; longer lines are truncated.
pub const MAX_EXPRESSION_LENGTH: usize = 15;

/// Number of custom (key-supplied) entries.
pub const MAX_DICTIONARY_CUSTOM_LENGTH: usize = 20;

/// Custom entries plus one entry per byte value.
pub const MAX_DICTIONARY_TOTAL_LENGTH: usize = MAX_DICTIONARY_CUSTOM_LENGTH + 256;

/// Key installed when none was given before the first pack/unpack.
///
/// Registers `true`, `false` and the three bytes `,\n` (a literal backslash
/// followed by `n`).
pub const DEFAULT_KEY: &str = "3274727565\n3266616c7365\n1e2c5c6e";

/// Bytes that get the top heuristic weight, compared in uppercase.
const FREQUENT_BYTES: &[u8] = b" :\"'.,\nIOUHLNRST0123456789ABCDEF";

const WEIGHT_FREQUENT: u32 = 10_000;
const WEIGHT_LOWERCASE: u32 = 1_000;
const WEIGHT_PRINTABLE: u32 = 200;
const WEIGHT_OTHER: u32 = 1;

/// A dictionary symbol: 1 to [`MAX_EXPRESSION_LENGTH`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression(Vec<u8>);

impl Expression {
    /// Build an expression, truncating to [`MAX_EXPRESSION_LENGTH`] bytes.
    ///
    /// Returns `None` for an empty slice.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let len = bytes.len().min(MAX_EXPRESSION_LENGTH);
        Some(Self(bytes[..len].to_vec()))
    }

    /// Single-byte expression.
    pub fn byte(b: u8) -> Self {
        Self(vec![b])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Printable rendering: ASCII as-is, everything else as `char(<n>)`.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if (b' '..=b'~').contains(&b) {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "char({})", b)?;
            }
        }
        Ok(())
    }
}

/// One weighted symbol, ready to become a tree leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub weight: u32,
    pub expression: Expression,
}

impl DictionaryEntry {
    pub fn new(weight: u32, expression: Expression) -> Self {
        Self { weight, expression }
    }
}

/// The full symbol table: custom entries followed by all 256 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
    custom_len: usize,
}

impl Dictionary {
    /// Parse a key and register every byte value.
    ///
    /// Rejected lines do not abort parsing; they are returned alongside the
    /// dictionary so the caller can report them.
    ///
    /// # Errors
    /// Only `Error::AllocationFailure`; malformed lines are not errors here.
    pub fn from_key(key: &str) -> Result<(Self, Vec<DictionaryError>)> {
        let mut entries = Vec::new();
        entries.try_reserve_exact(MAX_DICTIONARY_TOTAL_LENGTH)?;
        let mut rejected = Vec::new();

        for (index, line) in key.lines().enumerate() {
            let number = index + 1;
            if entries.len() >= MAX_DICTIONARY_CUSTOM_LENGTH {
                rejected.push(DictionaryError::DictionaryFull {
                    line: number,
                    capacity: MAX_DICTIONARY_CUSTOM_LENGTH,
                });
                continue;
            }
            match parse_line(line, number) {
                Ok(entry) => entries.push(entry),
                Err(e) => rejected.push(e),
            }
        }

        let custom_len = entries.len();
        entries.extend((0..=u8::MAX).map(|b| DictionaryEntry::new(byte_weight(b), Expression::byte(b))));

        Ok((
            Self {
                entries,
                custom_len,
            },
            rejected,
        ))
    }

    /// Wrap an explicit entry list, bypassing key parsing.
    ///
    /// Nothing guarantees full byte coverage here; used for building trees
    /// from hand-made tables.
    pub fn from_entries(entries: Vec<DictionaryEntry>) -> Self {
        Self {
            entries,
            custom_len: 0,
        }
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    /// Entries that came from the key.
    pub fn custom_entries(&self) -> &[DictionaryEntry] {
        &self.entries[..self.custom_len]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// CRC-32 over the ordered entries.
    ///
    /// Two endpoints holding the same key get the same fingerprint, which is
    /// a quick out-of-band check before exchanging packets.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for entry in &self.entries {
            hasher.update(&entry.weight.to_le_bytes());
            hasher.update(&[entry.expression.len() as u8]);
            hasher.update(entry.expression.as_bytes());
        }
        hasher.finalize()
    }
}

/// Heuristic weight for a single byte.
pub fn byte_weight(b: u8) -> u32 {
    if FREQUENT_BYTES.contains(&b.to_ascii_uppercase()) {
        WEIGHT_FREQUENT
    } else if b.is_ascii_lowercase() {
        WEIGHT_LOWERCASE
    } else if (b' '..=b'~').contains(&b) {
        WEIGHT_PRINTABLE
    } else {
        WEIGHT_OTHER
    }
}

/// Parse one key line. Non-hex characters are skipped.
fn parse_line(line: &str, number: usize) -> std::result::Result<DictionaryEntry, DictionaryError> {
    let digits: Vec<u8> = line
        .bytes()
        .filter_map(|c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();

    let invalid = DictionaryError::InvalidExpressionLine {
        line: number,
        hex_digits: digits.len(),
    };

    // chunks_exact drops a trailing odd digit
    let mut bytes = digits.chunks_exact(2).map(|pair| pair[0] << 4 | pair[1]);
    let weight = bytes.next().ok_or_else(|| invalid.clone())?;
    let content: Vec<u8> = bytes.take(MAX_EXPRESSION_LENGTH).collect();
    let expression = Expression::new(&content).ok_or(invalid)?;

    Ok(DictionaryEntry::new(weight as u32, expression))
}
