//! Huffman tree built from a weighted dictionary.
//!
//! # Construction
//!
//! The builder keeps a slot array of not-yet-merged nodes, initially the
//! dictionary leaves in dictionary order. Each round removes the lightest
//! node, then the next lightest, and puts their parent back into the first
//! empty slot. Ties go to the lowest slot index.
//!
//! The tie-break fixes the tree shape and with it every code; both
//! endpoints must merge in exactly this order to understand each other.

use tracing::debug;

use crate::bitio::BitReader;
use crate::dictionary::{Dictionary, Expression};
use crate::error::{HuffmanError, Result};

/// A tree node. Children are owned; there is no sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf {
        weight: u64,
        expression: Expression,
    },
    Internal {
        weight: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    fn merge(left: Node, right: Node) -> Node {
        Node::Internal {
            weight: left.weight() + right.weight(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Shape summary, mostly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub leaves: usize,
    pub internal_nodes: usize,
    /// Longest root-to-leaf path in edges
    pub depth: usize,
}

/// A built Huffman tree. The root is always an internal node.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    root: Node,
}

impl HuffmanTree {
    /// Build the tree for a dictionary.
    ///
    /// # Errors
    /// - `HuffmanError::TreeBuildFailure` for an empty dictionary, or one
    ///   whose only entry would become a leaf root (nothing to walk)
    /// - `Error::AllocationFailure` if the working set cannot be reserved
    pub fn build(dictionary: &Dictionary) -> Result<Self> {
        let mut slots: Vec<Option<Node>> = Vec::new();
        slots.try_reserve_exact(dictionary.len())?;
        slots.extend(dictionary.entries().iter().map(|entry| {
            Some(Node::Leaf {
                weight: entry.weight as u64,
                expression: entry.expression.clone(),
            })
        }));

        let mut merges = 0usize;
        loop {
            let first = take_lightest(&mut slots)
                .ok_or(HuffmanError::TreeBuildFailure("empty dictionary"))?;

            let Some(second) = take_lightest(&mut slots) else {
                if first.is_leaf() {
                    return Err(HuffmanError::TreeBuildFailure("single-entry dictionary").into());
                }
                debug!(leaves = dictionary.len(), merges, root_weight = first.weight(), "built huffman tree");
                return Ok(Self { root: first });
            };

            let merged = Node::merge(first, second);
            merges += 1;
            // Two slots were just emptied, so there is always a free one.
            match slots.iter_mut().find(|slot| slot.is_none()) {
                Some(slot) => *slot = Some(merged),
                None => slots.push(Some(merged)),
            }
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            leaves: 0,
            internal_nodes: 0,
            depth: 0,
        };
        collect_stats(&self.root, 0, &mut stats);
        stats
    }

    /// Walk the tree over the remaining bits of `reader`, appending each
    /// reached leaf's expression to `out`.
    ///
    /// Returns the number of trailing bits that ended mid-path and were
    /// dropped.
    ///
    /// # Errors
    /// - `HuffmanError::TraversalFailure` if the walk ever sits on a leaf
    ///   before consuming a bit (only possible with a corrupted tree)
    /// - `Error::AllocationFailure` if `out` cannot grow
    pub fn decode_into(&self, reader: &mut BitReader<'_>, out: &mut Vec<u8>) -> Result<usize> {
        let mut node = &self.root;
        let mut pending = 0usize;

        while let Some(bit) = reader.next_bit() {
            node = match node {
                Node::Internal { left, right, .. } => {
                    if bit {
                        right
                    } else {
                        left
                    }
                }
                Node::Leaf { .. } => {
                    return Err(HuffmanError::TraversalFailure {
                        position: reader.position() - 1,
                    }
                    .into())
                }
            };
            pending += 1;

            if let Node::Leaf { expression, .. } = node {
                out.try_reserve(expression.len())?;
                out.extend_from_slice(expression.as_bytes());
                node = &self.root;
                pending = 0;
            }
        }

        Ok(pending)
    }
}

/// Remove and return the lightest node; first slot wins on ties.
fn take_lightest(slots: &mut [Option<Node>]) -> Option<Node> {
    let (index, _) = slots
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.as_ref().map(|node| (i, node.weight())))
        .min_by_key(|&(_, weight)| weight)?;
    slots[index].take()
}

fn collect_stats(node: &Node, depth: usize, stats: &mut TreeStats) {
    match node {
        Node::Leaf { .. } => {
            stats.leaves += 1;
            stats.depth = stats.depth.max(depth);
        }
        Node::Internal { left, right, .. } => {
            stats.internal_nodes += 1;
            collect_stats(left, depth + 1, stats);
            collect_stats(right, depth + 1, stats);
        }
    }
}
