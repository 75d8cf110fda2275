//! Code table derived from a Huffman tree.
//!
//! A pre-order, left-first walk assigns `0` to every left edge and `1` to
//! every right edge; each leaf's path is its code. The table keeps entries
//! in walk order (for the diagnostic dump) plus an index by expression bytes
//! for the encoder.

use std::collections::HashMap;
use std::fmt;

use crate::dictionary::{Expression, MAX_EXPRESSION_LENGTH};
use crate::error::{HuffmanError, Result};
use crate::huffman::{HuffmanTree, Node};

/// Longest code the table can hold.
pub const MAX_BINARY_PATH: usize = 128;

/// A bit string of at most [`MAX_BINARY_PATH`] bits, stored right-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Code {
    bits: u128,
    len: u8,
}

impl Code {
    /// The bits, right-aligned (the first bit of the code is the highest set position).
    pub fn bits(&self) -> u128 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// This code extended by one bit.
    ///
    /// # Errors
    /// `HuffmanError::CodeTooLong` past [`MAX_BINARY_PATH`] bits.
    pub fn push(self, bit: bool) -> Result<Code> {
        if self.len() >= MAX_BINARY_PATH {
            return Err(HuffmanError::CodeTooLong {
                length: self.len() + 1,
            }
            .into());
        }
        Ok(Code {
            bits: self.bits << 1 | bit as u128,
            len: self.len + 1,
        })
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.len()).rev() {
            f.write_str(if self.bits >> i & 1 == 1 { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Expression → code mapping for one installed key.
#[derive(Debug, Clone)]
pub struct CodeTable {
    /// Walk order
    entries: Vec<(Expression, Code)>,
    /// Expression bytes → position in `entries`; first-seen wins
    index: HashMap<Vec<u8>, usize>,
    longest: usize,
}

impl CodeTable {
    /// Derive the table by walking the tree.
    ///
    /// # Errors
    /// - `HuffmanError::CodeTooLong` if any leaf sits deeper than 128 edges
    /// - `Error::AllocationFailure` if the table cannot be reserved
    pub fn from_tree(tree: &HuffmanTree) -> Result<Self> {
        let leaves = tree.stats().leaves;
        let mut table = CodeTable {
            entries: Vec::new(),
            index: HashMap::new(),
            longest: 0,
        };
        table.entries.try_reserve_exact(leaves)?;
        table.index.try_reserve(leaves)?;

        table.walk(tree.root(), Code::default())?;
        Ok(table)
    }

    fn walk(&mut self, node: &Node, path: Code) -> Result<()> {
        match node {
            Node::Leaf { expression, .. } => {
                let position = self.entries.len();
                self.index
                    .entry(expression.as_bytes().to_vec())
                    .or_insert(position);
                self.longest = self.longest.max(expression.len());
                self.entries.push((expression.clone(), path));
                Ok(())
            }
            Node::Internal { left, right, .. } => {
                self.walk(left, path.push(false)?)?;
                self.walk(right, path.push(true)?)
            }
        }
    }

    /// Code for exactly these bytes.
    pub fn get(&self, expression: &[u8]) -> Option<&Code> {
        self.index.get(expression).map(|&i| &self.entries[i].1)
    }

    /// Longest registered expression that prefixes `input`, with its code.
    ///
    /// Candidate lengths run from [`MAX_EXPRESSION_LENGTH`] (or the input
    /// length, if shorter) down to 1, and the first hit wins.
    pub fn longest_match(&self, input: &[u8]) -> Option<(usize, &Code)> {
        let max = input.len().min(MAX_EXPRESSION_LENGTH).min(self.longest);
        (1..=max)
            .rev()
            .find_map(|len| self.get(&input[..len]).map(|code| (len, code)))
    }

    /// Entries in walk order.
    pub fn entries(&self) -> &[(Expression, Code)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Diagnostic dump: one `[expression]:<n>bits <code>` line per entry.
impl fmt::Display for CodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "code table:")?;
        for (expression, code) in &self.entries {
            writeln!(f, "[{}]:{}bits {}", expression, code.len(), code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{Dictionary, DictionaryEntry, DEFAULT_KEY};
    use crate::error::Error;

    fn table_for(entries: Vec<DictionaryEntry>) -> CodeTable {
        let tree = HuffmanTree::build(&Dictionary::from_entries(entries)).unwrap();
        CodeTable::from_tree(&tree).unwrap()
    }

    fn entry(weight: u32, expr: &[u8]) -> DictionaryEntry {
        DictionaryEntry::new(weight, Expression::new(expr).unwrap())
    }

    #[test]
    fn test_codes_follow_walk() {
        let table = table_for(vec![entry(3, b"c"), entry(1, b"a"), entry(1, b"b")]);
        assert_eq!(table.get(b"a").unwrap().to_string(), "00");
        assert_eq!(table.get(b"b").unwrap().to_string(), "01");
        assert_eq!(table.get(b"c").unwrap().to_string(), "1");

        let order: Vec<&[u8]> = table.entries().iter().map(|(e, _)| e.as_bytes()).collect();
        assert_eq!(order, vec![&b"a"[..], b"b", b"c"]);
    }

    #[test]
    fn test_prefix_free() {
        let (dict, _) = Dictionary::from_key(DEFAULT_KEY).unwrap();
        let tree = HuffmanTree::build(&dict).unwrap();
        let table = CodeTable::from_tree(&tree).unwrap();
        assert_eq!(table.len(), dict.len());

        let codes: Vec<String> = table.entries().iter().map(|(_, c)| c.to_string()).collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a.as_str()), "{a} prefixes {b}");
                }
            }
        }
    }

    #[test]
    fn test_longest_match_prefers_longer() {
        let table = table_for(vec![
            entry(50, b"id"),
            entry(10, b"i"),
            entry(10, b"d"),
            entry(10, b"x"),
        ]);
        let (len, code) = table.longest_match(b"idx").unwrap();
        assert_eq!(len, 2);
        assert_eq!(code, table.get(b"id").unwrap());

        let (len, _) = table.longest_match(b"xid").unwrap();
        assert_eq!(len, 1);
        assert!(table.longest_match(b"q").is_none());
    }

    #[test]
    fn test_duplicate_expression_first_wins() {
        let table = table_for(vec![entry(1, b"a"), entry(9, b"a"), entry(5, b"b")]);
        assert_eq!(table.len(), 3);
        let first = table.entries().iter().find(|(e, _)| e.as_bytes() == b"a").unwrap().1;
        assert_eq!(table.get(b"a"), Some(&first));
    }

    #[test]
    fn test_code_push_limit() {
        let mut code = Code::default();
        for i in 0..MAX_BINARY_PATH {
            code = code.push(i % 3 == 0).unwrap();
        }
        assert_eq!(code.len(), MAX_BINARY_PATH);
        let err = code.push(true).unwrap_err();
        assert!(matches!(
            err,
            Error::Huffman(HuffmanError::CodeTooLong { length: 129 })
        ));
    }

    #[test]
    fn test_deep_tree_code_too_long() {
        // Zero weights: every merged node lands back in slot 0 and wins the
        // next tie, so the tree degenerates into a chain.
        let entries: Vec<DictionaryEntry> = (0..131u8).map(|i| entry(0, &[i, 0])).collect();
        let tree = HuffmanTree::build(&Dictionary::from_entries(entries)).unwrap();
        assert!(tree.stats().depth > MAX_BINARY_PATH);

        let err = CodeTable::from_tree(&tree).unwrap_err();
        assert!(matches!(err, Error::Huffman(HuffmanError::CodeTooLong { .. })));
    }

    #[test]
    fn test_dump_format() {
        let table = table_for(vec![entry(3, b"c"), entry(1, b"\n"), entry(1, b"b")]);
        let dump = table.to_string();
        assert_eq!(dump, "code table:\n[char(10)]:2bits 00\n[b]:2bits 01\n[c]:1bits 1\n");
    }
}
