pub mod build;
pub mod check;
pub mod neighbors;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::graph::GraphConfig;

#[derive(Parser, Debug)]
#[command(name = "dbgraph")]
#[command(about = "Build and query de Bruijn graphs over solid k-mers", version)]
pub struct Cli {
    /// Logging verbosity (0 = warnings, 1 = progress, 2 = debug, 3 = trace).
    /// RUST_LOG takes precedence when set.
    #[arg(short = 'v', long, default_value = "1", global = true)]
    pub verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Tracing filter directive for `--verbosity`.
    pub fn log_filter(&self) -> &'static str {
        GraphConfig {
            verbosity: self.verbosity,
            ..GraphConfig::default()
        }
        .log_filter()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    Build(build::BuildArgs),
    Check(check::CheckArgs),
    Neighbors(neighbors::NeighborsArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    let verbosity = cli.verbosity;
    match cli.command {
        Commands::Build(args) => build::run(args, verbosity),
        Commands::Check(args) => check::run(args),
        Commands::Neighbors(args) => neighbors::run(args),
    }
}
