//! De Bruijn graphs over solid k-mer sets.
//!
//! - [`iter`]: lazy cursor sequences and their combinators
//! - [`dispatch`]: partitioned parallel visitation with per-worker state
//! - [`graph`]: k-mer model, nodes and edges, the solid set, the [`Graph`](graph::Graph) façade
//! - [`io`]: sequence banks and graph metadata

pub mod cli;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod io;
pub mod iter;

pub use error::{GraphError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
