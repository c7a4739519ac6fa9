//! Nodes, edges and traversal directions.
//!
//! A node's identity is its canonical k-mer. The strand it carries records
//! which encoding the caller is currently reading, so neighbor queries extend
//! the caller's sequence rather than the canonical one. Equality and hashing
//! ignore strand and abundance.

use std::hash::{Hash, Hasher};
use std::ops::Deref;

use super::kmer::{KmerModel, Nucleotide, Strand};

/// A solid k-mer seen from one strand.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    /// Canonical 2-bit packed k-mer.
    pub kmer: u64,
    /// Orientation the caller reads this node in.
    pub strand: Strand,
    /// Abundance recorded for the k-mer in the solid set.
    pub abundance: u32,
}

impl Node {
    pub fn new(kmer: u64, strand: Strand, abundance: u32) -> Self {
        Self {
            kmer,
            strand,
            abundance,
        }
    }

    /// The same node read from the other strand.
    pub fn reversed(self) -> Self {
        Self {
            strand: self.strand.flip(),
            ..self
        }
    }

    /// Packed sequence as the caller reads it.
    #[inline]
    pub fn oriented(&self, model: &KmerModel) -> u64 {
        model.oriented(self.kmer, self.strand)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kmer == other.kmer
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kmer.hash(state);
    }
}

/// Direction of a neighbor query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Successors: one nucleotide appended on the 3' end.
    Outgoing,
    /// Predecessors: one nucleotide prepended on the 5' end.
    Incoming,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Self::Outgoing => Self::Incoming,
            Self::Incoming => Self::Outgoing,
        }
    }
}

/// A one-nucleotide extension between two solid k-mers.
///
/// For outgoing edges `nt` is the last base of `to`; for incoming edges it is
/// the first base of `to`. Both are read on `to.strand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: Node,
    pub to: Node,
    pub nt: Nucleotide,
    pub direction: Direction,
}

impl Edge {
    /// The same extension seen from `to`, pointing back at `from`.
    pub fn reversed(&self, model: &KmerModel) -> Self {
        let origin = self.from.oriented(model);
        let nt = match self.direction {
            Direction::Outgoing => model.nucleotide_at(origin, 0),
            Direction::Incoming => model.nucleotide_at(origin, model.k() - 1),
        };
        Self {
            from: self.to,
            to: self.from,
            nt,
            direction: self.direction.reverse(),
        }
    }
}

/// A node whose in-degree or out-degree differs from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchingNode(pub Node);

impl Deref for BranchingNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.0
    }
}

impl From<BranchingNode> for Node {
    fn from(b: BranchingNode) -> Self {
        b.0
    }
}
