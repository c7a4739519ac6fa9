//! Graph construction parameters.

use serde::{Deserialize, Serialize};

use super::kmer::MAX_KMER_SIZE;
use crate::error::{GraphError, Result};

/// Configuration for building a graph from a bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// K-mer length (1..=32).
    pub kmer_size: usize,
    /// Minimum count for a k-mer to be solid.
    pub abundance_min: u32,
    /// 0 = warnings only, 1 = progress, 2 = debug, 3+ = trace.
    pub verbosity: u8,
    /// Worker threads for counting and traversal (0 = all cores).
    pub nb_cores: usize,
    /// Sequences read from the bank per counting batch.
    pub chunk_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            kmer_size: 31,
            abundance_min: 2,
            verbosity: 1,
            nb_cores: 0,
            chunk_size: 10_000,
        }
    }
}

impl GraphConfig {
    pub fn new(kmer_size: usize, abundance_min: u32) -> Self {
        Self {
            kmer_size,
            abundance_min,
            ..Self::default()
        }
    }

    /// Reject parameters no graph can be built with.
    pub fn validate(&self) -> Result<()> {
        if self.kmer_size == 0 || self.kmer_size > MAX_KMER_SIZE {
            return Err(GraphError::InvalidConfiguration(format!(
                "kmer_size must be in 1..={MAX_KMER_SIZE}, got {}",
                self.kmer_size
            )));
        }
        if self.abundance_min == 0 {
            return Err(GraphError::InvalidConfiguration(
                "abundance_min must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(GraphError::InvalidConfiguration(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Default tracing filter directive for this verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GraphConfig::default().validate().is_ok());
        assert!(GraphConfig::new(32, 1).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        for cfg in [
            GraphConfig::new(0, 1),
            GraphConfig::new(33, 1),
            GraphConfig::new(21, 0),
            GraphConfig {
                chunk_size: 0,
                ..GraphConfig::default()
            },
        ] {
            assert!(matches!(cfg.validate(), Err(GraphError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn test_log_filter() {
        let mut cfg = GraphConfig::default();
        cfg.verbosity = 0;
        assert_eq!(cfg.log_filter(), "warn");
        cfg.verbosity = 2;
        assert_eq!(cfg.log_filter(), "debug");
        cfg.verbosity = 9;
        assert_eq!(cfg.log_filter(), "trace");
    }
}
