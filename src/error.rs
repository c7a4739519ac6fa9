//! Error types for graph construction, loading and traversal.
//!
//! None of these are retried internally. Construction and load errors leave
//! no graph behind; dispatch errors are reported once, after every worker
//! has been joined.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// A k-mer window contained a symbol outside `{A, C, G, T}`.
    #[error("malformed sequence: symbol {symbol:?} at position {position} is not a nucleotide")]
    MalformedSequence { symbol: char, position: usize },

    /// Parameters rejected before any input was read.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A persisted solid k-mer set is missing, corrupt or inconsistent.
    #[error("solid k-mer set unavailable at {}: {reason}", path.display())]
    OracleUnavailable { path: PathBuf, reason: String },

    /// At least one per-element operation failed during a dispatch.
    ///
    /// `worker` identifies the first failure observed; `failed_workers` counts
    /// every worker that stopped on an error.
    #[error("dispatch failed on worker {worker} ({failed_workers} worker(s) failed)")]
    WorkerFailure {
        worker: usize,
        failed_workers: usize,
        #[source]
        source: anyhow::Error,
    },

    /// Dispatch needs a known size to partition its input.
    #[error("cannot partition a sequence of unknown size; materialize or truncate it first")]
    UnsizedSequence,

    /// The sequence bank could not be read during construction.
    #[error("failed to read sequence bank")]
    Bank(#[source] anyhow::Error),

    /// The `.json` sidecar of a graph could not be written.
    #[error("failed to write graph metadata to {}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    pub(crate) fn oracle(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::OracleUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = GraphError::MalformedSequence {
            symbol: 'N',
            position: 3,
        };
        assert_eq!(
            e.to_string(),
            "malformed sequence: symbol 'N' at position 3 is not a nucleotide"
        );

        let e = GraphError::oracle("/tmp/g.solid", "bad magic");
        assert_eq!(
            e.to_string(),
            "solid k-mer set unavailable at /tmp/g.solid: bad magic"
        );
    }

    #[test]
    fn test_worker_failure_keeps_source() {
        let e = GraphError::WorkerFailure {
            worker: 2,
            failed_workers: 1,
            source: anyhow::anyhow!("element 7 rejected"),
        };
        let source = std::error::Error::source(&e).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("element 7 rejected"));
    }

    #[test]
    fn test_metadata_keeps_source() {
        let e = GraphError::Metadata {
            path: PathBuf::from("/tmp/g.json"),
            source: anyhow::anyhow!("disk full"),
        };
        assert_eq!(e.to_string(), "failed to write graph metadata to /tmp/g.json");
        let source = std::error::Error::source(&e).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk full"));
    }
}
