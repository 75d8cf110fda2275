//! hexpack-core: keyed Huffman text codec with a printable hex wire format
//!
//! Two endpoints that share a key can squeeze short, ASCII-heavy messages
//! (IDs, key/value fragments) into a compact lowercase hex string and back:
//! - The key supplies up to 20 weighted multi-byte expressions
//! - All 256 byte values are always registered, so any input encodes
//! - Greedy longest-match tokenization picks expressions over single bytes
//! - A 4-bit XOR checksum catches accidental corruption
//!
//! Different keys give different trees, so packets are unreadable without
//! the key. This is obscurity only: there is no cryptographic protection.
//!
//! # Architecture
//!
//! - `dictionary`: key parsing and the weighted symbol table
//! - `huffman`: tree construction and the decoding walk
//! - `codebook`: code table derived from the tree
//! - `bitio`: MSB-first bit reading/writing
//! - `framing`: pad count, hex nibbles and checksum
//! - `codec`: the public pack/unpack API
//! - `metrics`: per-codec counters
//!
//! # Example
//! ```
//! use hexpack_core::Codec;
//!
//! let mut codec = Codec::with_seed(7);
//! let packed = codec.pack_str("true").unwrap();
//! assert_eq!(codec.unpack_str(&packed).unwrap(), "true");
//! assert_eq!(codec.pack_str("").unwrap(), "00");
//! ```

pub mod bitio;
pub mod codebook;
pub mod codec;
pub mod dictionary;
pub mod error;
pub mod framing;
pub mod huffman;
pub mod metrics;

// Re-export commonly used types
pub use codec::{Codec, Diagnostic, DiagnosticSink, KeyReport};
pub use dictionary::{Dictionary, DEFAULT_KEY};
pub use error::{Error, Result};
pub use metrics::CodecMetrics;
