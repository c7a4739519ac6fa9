//! Graph consistency check: two dispatcher passes whose per-worker
//! statistics fold into checksums that do not depend on the worker count.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::ops::AddAssign;
use std::path::PathBuf;

use crate::dispatch::Dispatcher;
use crate::error::GraphError;
use crate::graph::{Graph, SolidKmers};

#[derive(Args, Debug)]
#[command(about = "Traverse a saved graph and print node and branching statistics as JSON")]
pub struct CheckArgs {
    /// Path prefix of the graph files (e.g. /path/to/graph)
    #[arg(short, long)]
    pub graph: PathBuf,
    /// Number of threads (0 = all cores)
    #[arg(short = 't', long, default_value = "0")]
    pub threads: usize,
    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Accumulated over every node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub nodes: u64,
    /// Wrapping sum of canonical k-mers.
    pub checksum: u64,
    pub successors: u64,
    /// Wrapping sum of successor k-mers.
    pub successor_checksum: u64,
    pub abundance: u64,
}

impl AddAssign for NodeStats {
    fn add_assign(&mut self, o: Self) {
        self.nodes += o.nodes;
        self.checksum = self.checksum.wrapping_add(o.checksum);
        self.successors += o.successors;
        self.successor_checksum = self.successor_checksum.wrapping_add(o.successor_checksum);
        self.abundance += o.abundance;
    }
}

/// Accumulated over branching nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BranchingStats {
    pub nodes: u64,
    pub checksum: u64,
    pub abundance: u64,
}

impl AddAssign for BranchingStats {
    fn add_assign(&mut self, o: Self) {
        self.nodes += o.nodes;
        self.checksum = self.checksum.wrapping_add(o.checksum);
        self.abundance += o.abundance;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub kmer_size: usize,
    pub workers: usize,
    pub nodes: NodeStats,
    pub branching: BranchingStats,
    pub node_pass_secs: f64,
    pub branching_pass_secs: f64,
}

/// Run both passes over `graph`.
pub fn check_graph<O: SolidKmers>(
    graph: &Graph<O>,
    dispatcher: &Dispatcher,
) -> std::result::Result<CheckReport, GraphError> {
    let node_pass = graph.visit_nodes(dispatcher, NodeStats::default, |stats, node| {
        stats.nodes += 1;
        stats.checksum = stats.checksum.wrapping_add(node.kmer);
        stats.abundance += u64::from(node.abundance);
        for edge in graph.successors(&node) {
            stats.successors += 1;
            stats.successor_checksum = stats.successor_checksum.wrapping_add(edge.to.kmer);
        }
        Ok(())
    })?;

    let branching_pass = graph.visit_branching(dispatcher, BranchingStats::default, |stats, node| {
        stats.nodes += 1;
        stats.checksum = stats.checksum.wrapping_add(node.kmer);
        stats.abundance += u64::from(node.abundance);
        Ok(())
    })?;

    Ok(CheckReport {
        kmer_size: graph.kmer_size(),
        workers: node_pass.status.workers,
        node_pass_secs: node_pass.status.elapsed.as_secs_f64(),
        branching_pass_secs: branching_pass.status.elapsed.as_secs_f64(),
        nodes: node_pass.locals.merge(|total, s| *total += s),
        branching: branching_pass.locals.merge(|total, s| *total += s),
    })
}

pub fn run(args: CheckArgs) -> Result<()> {
    let graph = Graph::load(&args.graph)
        .with_context(|| format!("failed to load graph at {}", args.graph.display()))?;
    let report = check_graph(&graph, &Dispatcher::new(args.threads))?;

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
