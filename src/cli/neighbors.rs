use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};
use std::path::PathBuf;

use crate::graph::{Edge, Graph, SolidKmers};

#[derive(Args, Debug)]
#[command(about = "Print the neighbors of k-mers in a saved graph as JSON")]
pub struct NeighborsArgs {
    /// Path prefix of the graph files (e.g. /path/to/graph)
    #[arg(short, long)]
    pub graph: PathBuf,
    /// K-mers to look up, read on the strand given
    #[arg(required = true)]
    pub kmers: Vec<String>,
}

fn edge_json<O: SolidKmers>(graph: &Graph<O>, edge: &Edge) -> Value {
    json!({
        "nt": edge.nt.to_string(),
        "node": graph.node_to_string(&edge.to),
        "abundance": edge.to.abundance,
    })
}

/// Describe one k-mer: membership, degrees and both neighbor lists.
pub fn describe<O: SolidKmers>(graph: &Graph<O>, kmer: &str) -> Result<Value> {
    let node = graph
        .node_from_str(&kmer.to_ascii_uppercase())
        .with_context(|| format!("invalid k-mer {kmer:?}"))?;
    let successors: Vec<Value> = graph.successors(&node).iter().map(|e| edge_json(graph, e)).collect();
    let predecessors: Vec<Value> = graph
        .predecessors(&node)
        .iter()
        .map(|e| edge_json(graph, e))
        .collect();

    Ok(json!({
        "kmer": graph.node_to_string(&node),
        "canonical": graph.model().decode(node.kmer),
        "strand": format!("{:?}", node.strand),
        "solid": graph.contains(&node),
        "abundance": node.abundance,
        "in_degree": predecessors.len(),
        "out_degree": successors.len(),
        "branching": graph.is_branching(&node),
        "successors": successors,
        "predecessors": predecessors,
    }))
}

pub fn run(args: NeighborsArgs) -> Result<()> {
    let graph = Graph::load(&args.graph)
        .with_context(|| format!("failed to load graph at {}", args.graph.display()))?;

    let out = args
        .kmers
        .iter()
        .map(|kmer| describe(&graph, kmer))
        .collect::<Result<Vec<_>>>()?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
