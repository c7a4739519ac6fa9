use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::graph::{Graph, GraphConfig};
use crate::io::bank::FastaBank;

#[derive(Args, Debug)]
#[command(about = "Count solid k-mers from FASTA/FASTQ input and save the graph")]
pub struct BuildArgs {
    /// Input FASTA/FASTQ files (optionally compressed)
    #[arg(short = 'i', long, num_args = 1.., required = true)]
    pub input: Vec<PathBuf>,
    /// Output prefix for graph files
    #[arg(short = 'o', long)]
    pub output: PathBuf,
    /// K-mer length (1..=32)
    #[arg(short = 'k', long, default_value = "31")]
    pub klen: usize,
    /// Minimum abundance for a k-mer to be solid
    #[arg(short = 'a', long, default_value = "2")]
    pub abundance_min: u32,
    /// Number of threads (0 = all cores)
    #[arg(short = 't', long, default_value = "0")]
    pub threads: usize,
    /// Sequences per counting batch
    #[arg(long, default_value = "10000")]
    pub chunk_size: usize,
}

impl BuildArgs {
    pub fn config(&self, verbosity: u8) -> GraphConfig {
        GraphConfig {
            kmer_size: self.klen,
            abundance_min: self.abundance_min,
            verbosity,
            nb_cores: self.threads,
            chunk_size: self.chunk_size,
        }
    }
}

pub fn run(args: BuildArgs, verbosity: u8) -> Result<()> {
    let start = Instant::now();
    let config = args.config(verbosity);
    config.validate()?;

    let mut bank = FastaBank::open(&args.input)?;
    let graph = Graph::create(&mut bank, &config).context("graph construction failed")?;
    info!(
        "Built graph: k={}, {} solid k-mers from {} records",
        graph.kmer_size(),
        graph.num_nodes(),
        bank.records()
    );

    graph
        .save(&args.output)
        .with_context(|| format!("failed to save graph to {}", args.output.display()))?;
    info!("Done in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}
