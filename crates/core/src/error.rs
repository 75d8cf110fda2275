//! Error types for the hexpack codec.
//!
//! All operations return structured errors rather than panicking. Pack and
//! unpack never return partial output: a failure means no data at all.

use std::collections::TryReserveError;
use thiserror::Error;

/// Top-level error type for all operations in the codec.
///
/// Each variant corresponds to a specific failure domain:
/// - Dictionary: key lines that could not be turned into entries
/// - Huffman: tree construction or code table derivation
/// - Format: malformed packed strings
/// - Checksum: accidental corruption detected by the XOR nibble
/// - Encoding: input bytes with no code (unreachable with a full table)
#[derive(Debug, Error)]
pub enum Error {
    /// A key line was rejected
    #[error("dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    /// Tree build or traversal failed
    #[error("huffman error: {0}")]
    Huffman(#[from] HuffmanError),

    /// Packed string is malformed
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// Checksum nibble does not match the data nibbles
    #[error("checksum mismatch: packet says {expected:#x}, computed {actual:#x}")]
    Checksum { expected: u8, actual: u8 },

    /// No code table entry matched the input at this position
    #[error("no code for byte {byte:#04x} at position {position}")]
    EncodingFailure { position: usize, byte: u8 },

    /// Growing a buffer or table failed
    #[error("allocation failure: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// Bit I/O operation failed (e.g., reading past end of buffer)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key line errors.
///
/// These are reported per line; the remaining lines of the key are still
/// processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    /// Line has no weight byte, or a weight with no expression bytes
    #[error("key line {line}: invalid expression ({hex_digits} hex digits)")]
    InvalidExpressionLine { line: usize, hex_digits: usize },

    /// All custom slots are already taken
    #[error("key line {line}: dictionary full ({capacity} custom entries)")]
    DictionaryFull { line: usize, capacity: usize },
}

/// Huffman tree errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HuffmanError {
    /// Tree cannot be built (empty or single-entry dictionary)
    #[error("cannot build tree: {0}")]
    TreeBuildFailure(&'static str),

    /// Path to a leaf exceeds MAX_BINARY_PATH
    #[error("code length {length} exceeds maximum 128")]
    CodeTooLong { length: usize },

    /// Tree walk ended somewhere it should not have
    #[error("tree traversal failed at bit {position}")]
    TraversalFailure { position: usize },
}

/// Packed string format errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Length is too short or odd
    #[error("packed length {length} is not an even number greater than 2")]
    BadLength { length: usize },

    /// First digit is not '0'..='7'
    #[error("invalid pad count digit {found:?}")]
    BadPadCount { found: char },

    /// A data or checksum position holds a non-hex character
    #[error("invalid hex digit {found:?} at position {position}")]
    BadHexDigit { position: usize, found: char },

    /// Decoded bytes are not valid UTF-8
    #[error("unpacked data is not valid UTF-8")]
    InvalidUtf8,
}

/// Bit-level I/O errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitIoError {
    /// Attempted to read past the end of the buffer
    #[error("unexpected end of bit stream")]
    UnexpectedEof,

    /// Invalid bit count (more than 128 bits in one call)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
