//! The de Bruijn graph façade.
//!
//! A [`Graph`] is a k-mer model plus a read-only solid k-mer set. Nodes are
//! enumerated from the set by rank and edges are never stored: they are
//! recomputed on demand by extending a node with each nucleotide and asking
//! the set whether the canonical result is present.
//!
//! # Persistence
//!
//! Given a prefix like `/path/to/graph`:
//! - `/path/to/graph.solid`: the solid k-mer set
//! - `/path/to/graph.json`: [`GraphInfo`] metadata

pub mod config;
pub mod count;
pub mod kmer;
pub mod node;
pub mod solid;

use std::path::{Path, PathBuf};

use smallvec::SmallVec;
use tracing::info;

pub use config::GraphConfig;
pub use kmer::{KmerModel, MAX_KMER_SIZE, Nucleotide, Strand};
pub use node::{BranchingNode, Direction, Edge, Node};
pub use solid::{SolidKmerSet, SolidKmers};

use crate::dispatch::{DispatchFailure, Dispatched, Dispatcher};
use crate::error::{GraphError, Result};
use crate::io::bank::Bank;
use crate::io::graph_info::GraphInfo;
use crate::iter::{Filter, Map, Sequence};

/// Neighbor edges of one node in one direction (at most four).
pub type Edges = SmallVec<[Edge; 4]>;
/// Neighbor nodes of one node in one direction (at most four).
pub type Nodes = SmallVec<[Node; 4]>;

const SOLID_EXT: &str = "solid";
const INFO_EXT: &str = "json";

fn with_ext(prefix: &Path, ext: &str) -> PathBuf {
    let mut p = prefix.to_path_buf();
    p.set_extension(ext);
    p
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

pub struct Graph<O = SolidKmerSet> {
    model: KmerModel,
    solid: O,
    abundance_min: u32,
}

impl Graph<SolidKmerSet> {
    /// Count `bank` and keep its solid k-mers as the node set.
    ///
    /// `config` is validated before the bank is read.
    pub fn create<B: Bank + ?Sized>(bank: &mut B, config: &GraphConfig) -> Result<Self> {
        config.validate()?;
        let dispatcher = Dispatcher::new(config.nb_cores);
        let solid = count::build_solid_set(bank, config, &dispatcher)?;
        Ok(Self {
            model: *solid.model(),
            solid,
            abundance_min: config.abundance_min,
        })
    }

    /// Reopen a graph written by [`Graph::save`].
    pub fn load(prefix: &Path) -> Result<Self> {
        let info_path = with_ext(prefix, INFO_EXT);
        let graph_info =
            GraphInfo::load(&info_path).map_err(|e| GraphError::oracle(&info_path, format!("{e:#}")))?;

        let solid_path = with_ext(prefix, SOLID_EXT);
        let solid = SolidKmerSet::load_from_path(&solid_path)?;
        if solid.kmer_size() != graph_info.kmer_size {
            return Err(GraphError::oracle(
                &solid_path,
                format!(
                    "k={} does not match k={} recorded in {}",
                    solid.kmer_size(),
                    graph_info.kmer_size,
                    info_path.display()
                ),
            ));
        }
        if solid.len() != graph_info.num_solid {
            return Err(GraphError::oracle(
                &solid_path,
                format!(
                    "{} k-mers stored but {} recorded in {}",
                    solid.len(),
                    graph_info.num_solid,
                    info_path.display()
                ),
            ));
        }

        info!("Loaded graph from {}", prefix.display());
        Ok(Self {
            model: *solid.model(),
            solid,
            abundance_min: graph_info.abundance_min,
        })
    }

    /// Write `<prefix>.solid` and `<prefix>.json`.
    pub fn save(&self, prefix: &Path) -> Result<()> {
        self.solid.save_to_path(&with_ext(prefix, SOLID_EXT))?;
        let json_path = with_ext(prefix, INFO_EXT);
        self.info()
            .save(&json_path)
            .map_err(|source| GraphError::Metadata {
                path: json_path.clone(),
                source,
            })?;
        info!("Graph saved to {}", prefix.display());
        Ok(())
    }

    pub fn info(&self) -> GraphInfo {
        GraphInfo {
            kmer_size: self.model.k(),
            abundance_min: self.abundance_min,
            num_solid: self.solid.len(),
            total_abundance: self.solid.total_abundance(),
            version: crate::VERSION.to_string(),
        }
    }
}

impl<O: SolidKmers> Graph<O> {
    /// Wrap an existing solid k-mer set.
    pub fn from_solid(solid: O, abundance_min: u32) -> Result<Self> {
        let model = KmerModel::new(solid.kmer_size())?;
        Ok(Self {
            model,
            solid,
            abundance_min,
        })
    }

    #[inline]
    pub fn model(&self) -> &KmerModel {
        &self.model
    }

    #[inline]
    pub fn kmer_size(&self) -> usize {
        self.model.k()
    }

    pub fn abundance_min(&self) -> u32 {
        self.abundance_min
    }

    pub fn solid(&self) -> &O {
        &self.solid
    }

    pub fn num_nodes(&self) -> u64 {
        self.solid.len()
    }

    // -----------------------------------------------------------------------
    // Node conversions
    // -----------------------------------------------------------------------

    /// The node for an ASCII k-mer, on the strand that reads `kmer`.
    ///
    /// The abundance is 0 when the k-mer is not solid.
    pub fn node_from_str(&self, kmer: &str) -> Result<Node> {
        let packed = self.model.encode(kmer.as_bytes())?;
        let (canonical, strand) = self.model.canonical(packed);
        let abundance = self.solid.abundance(canonical).unwrap_or(0);
        Ok(Node::new(canonical, strand, abundance))
    }

    /// The sequence of `node` as read on its strand.
    pub fn node_to_string(&self, node: &Node) -> String {
        self.model.decode(node.oriented(&self.model))
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.solid.contains(node.kmer)
    }

    // -----------------------------------------------------------------------
    // Iteration
    // -----------------------------------------------------------------------

    /// Every solid k-mer as a forward node, in rank order.
    pub fn iter_nodes(&self) -> NodeSequence<'_, O> {
        NodeSequence::new(&self.solid)
    }

    /// Nodes whose in-degree or out-degree differs from one. The size is not
    /// known without a pass.
    pub fn iter_branching(
        &self,
    ) -> Map<Filter<NodeSequence<'_, O>, impl Fn(&Node) -> bool + Clone + Send + '_>, fn(Node) -> BranchingNode>
    {
        let branching = move |node: &Node| self.is_branching(node);
        Map::new(
            Filter::new(self.iter_nodes(), branching),
            BranchingNode as fn(Node) -> BranchingNode,
        )
    }

    // -----------------------------------------------------------------------
    // Neighbors
    // -----------------------------------------------------------------------

    /// Solid one-nucleotide extensions of `node` in `direction`, in
    /// nucleotide order.
    ///
    /// Extensions are taken from the node's own strand: outgoing appends on
    /// the 3' end of the oriented sequence, incoming prepends on its 5' end.
    pub fn neighbors(&self, node: &Node, direction: Direction) -> Edges {
        let from = node.oriented(&self.model);
        let mut edges = Edges::new();
        for nt in Nucleotide::ALL {
            let (kmer, strand) = self.model.canonical(self.extend(from, nt, direction));
            if let Some(abundance) = self.solid.abundance(kmer) {
                edges.push(Edge {
                    from: *node,
                    to: Node::new(kmer, strand, abundance),
                    nt,
                    direction,
                });
            }
        }
        edges
    }

    pub fn successors(&self, node: &Node) -> Edges {
        self.neighbors(node, Direction::Outgoing)
    }

    pub fn predecessors(&self, node: &Node) -> Edges {
        self.neighbors(node, Direction::Incoming)
    }

    pub fn successor_nodes(&self, node: &Node) -> Nodes {
        self.successors(node).into_iter().map(|e| e.to).collect()
    }

    pub fn predecessor_nodes(&self, node: &Node) -> Nodes {
        self.predecessors(node).into_iter().map(|e| e.to).collect()
    }

    pub fn out_degree(&self, node: &Node) -> usize {
        self.degree(node, Direction::Outgoing)
    }

    pub fn in_degree(&self, node: &Node) -> usize {
        self.degree(node, Direction::Incoming)
    }

    pub fn is_branching(&self, node: &Node) -> bool {
        self.in_degree(node) != 1 || self.out_degree(node) != 1
    }

    #[inline]
    fn extend(&self, oriented: u64, nt: Nucleotide, direction: Direction) -> u64 {
        match direction {
            Direction::Outgoing => self.model.push_back(oriented, nt),
            Direction::Incoming => self.model.push_front(oriented, nt),
        }
    }

    fn degree(&self, node: &Node, direction: Direction) -> usize {
        let from = node.oriented(&self.model);
        Nucleotide::ALL
            .into_iter()
            .filter(|&nt| {
                let (kmer, _) = self.model.canonical(self.extend(from, nt, direction));
                self.solid.contains(kmer)
            })
            .count()
    }

    // -----------------------------------------------------------------------
    // Bulk visitation
    // -----------------------------------------------------------------------

    /// Apply `op` to every node across `dispatcher`'s workers.
    pub fn visit_nodes<A, I, F>(
        &self,
        dispatcher: &Dispatcher,
        init: I,
        op: F,
    ) -> std::result::Result<Dispatched<A>, DispatchFailure<A>>
    where
        A: Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, Node) -> anyhow::Result<()> + Sync,
    {
        dispatcher.iterate_with(&self.iter_nodes(), init, op)
    }

    /// Apply `op` to every branching node across `dispatcher`'s workers.
    ///
    /// Partitioning is over all nodes; each worker classifies the nodes of
    /// its own range, so `status.visited` counts every node.
    pub fn visit_branching<A, I, F>(
        &self,
        dispatcher: &Dispatcher,
        init: I,
        op: F,
    ) -> std::result::Result<Dispatched<A>, DispatchFailure<A>>
    where
        A: Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, BranchingNode) -> anyhow::Result<()> + Sync,
    {
        dispatcher.iterate_with(&self.iter_nodes(), init, |local, node| {
            if self.is_branching(&node) {
                op(local, BranchingNode(node))?;
            }
            Ok(())
        })
    }
}

impl<O> std::fmt::Debug for Graph<O>
where
    O: SolidKmers,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("k", &self.model.k())
            .field("nodes", &self.solid.len())
            .field("abundance_min", &self.abundance_min)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// NodeSequence
// ---------------------------------------------------------------------------

/// Cursor over the solid set by rank. Random access, so dispatcher workers
/// jump straight to their range.
pub struct NodeSequence<'g, O: ?Sized> {
    solid: &'g O,
    rank: u64,
    len: u64,
}

impl<'g, O: SolidKmers + ?Sized> NodeSequence<'g, O> {
    pub fn new(solid: &'g O) -> Self {
        let len = solid.len();
        Self {
            solid,
            rank: len,
            len,
        }
    }
}

impl<O: ?Sized> Clone for NodeSequence<'_, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O: ?Sized> Copy for NodeSequence<'_, O> {}

impl<O: SolidKmers + ?Sized> Sequence for NodeSequence<'_, O> {
    type Item = Node;

    fn first(&mut self) {
        self.rank = 0;
    }

    fn is_done(&self) -> bool {
        self.rank >= self.len
    }

    fn next(&mut self) {
        assert!(!self.is_done(), "next() called on a done sequence");
        self.rank += 1;
    }

    fn item(&self) -> Node {
        assert!(!self.is_done(), "item() called on a done sequence");
        match self.solid.get(self.rank) {
            Some((kmer, abundance)) => Node::new(kmer, Strand::Forward, abundance),
            None => panic!("solid set has no k-mer at rank {} of {}", self.rank, self.len),
        }
    }

    fn size(&self) -> Option<u64> {
        Some(self.len)
    }

    fn advance_by(&mut self, n: u64) {
        self.rank = self.rank.saturating_add(n).min(self.len);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
