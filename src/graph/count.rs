//! Solid k-mer counting over a sequence bank.
//!
//! The bank is read one chunk at a time. Each chunk is dispatched over the
//! worker pool with a private count table per worker; the tables are folded
//! into the global table after the chunk joins.

use std::collections::HashMap;
use std::time::Instant;

use ahash::RandomState;
use anyhow::Context;
use tracing::{debug, info};

use super::config::GraphConfig;
use super::kmer::KmerModel;
use super::solid::{SolidKmerSet, SolidKmers, fixed_hash_state};
use crate::dispatch::Dispatcher;
use crate::error::{GraphError, Result};
use crate::io::bank::{Bank, SequenceChunk};
use crate::iter::ListSequence;

/// Canonical k-mer → occurrence count.
pub type CountTable = HashMap<u64, u32, RandomState>;

fn new_table() -> CountTable {
    HashMap::with_hasher(fixed_hash_state())
}

fn add_count(table: &mut CountTable, kmer: u64, count: u32) {
    let slot = table.entry(kmer).or_insert(0);
    *slot = slot.saturating_add(count);
}

/// Totals reported by [`count_kmers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountSummary {
    pub sequences: u64,
    pub kmers: u64,
    pub distinct: u64,
}

/// Count every canonical k-mer of every sequence in `bank`.
pub fn count_kmers<B: Bank + ?Sized>(
    bank: &mut B,
    model: &KmerModel,
    config: &GraphConfig,
    dispatcher: &Dispatcher,
) -> Result<(CountTable, CountSummary)> {
    let mut global = new_table();
    let mut summary = CountSummary::default();
    let mut chunk = SequenceChunk::new();
    let mut batch = 0usize;

    while bank
        .next_chunk(&mut chunk, config.chunk_size)
        .with_context(|| format!("reading batch {batch}"))
        .map_err(GraphError::Bank)?
    {
        let seqs = ListSequence::new(&chunk);
        let done = dispatcher.iterate_with(&seqs, new_table, |table, seq| {
            for (_, kmer) in model.canonical_kmers(seq) {
                add_count(table, kmer, 1);
            }
            Ok(())
        })?;

        for (_, local) in done.locals.into_inner() {
            for (kmer, count) in local {
                summary.kmers += u64::from(count);
                add_count(&mut global, kmer, count);
            }
        }
        summary.sequences += chunk.len() as u64;
        debug!(
            "batch {batch}: {} sequences over {} workers, {} distinct k-mers so far",
            chunk.len(),
            done.status.workers,
            global.len()
        );
        batch += 1;
    }

    summary.distinct = global.len() as u64;
    Ok((global, summary))
}

/// Count `bank` and keep the k-mers seen at least `config.abundance_min`
/// times.
pub fn build_solid_set<B: Bank + ?Sized>(
    bank: &mut B,
    config: &GraphConfig,
    dispatcher: &Dispatcher,
) -> Result<SolidKmerSet> {
    config.validate()?;
    let model = KmerModel::new(config.kmer_size)?;
    let start = Instant::now();

    info!(
        "Counting {}-mers with {} workers (abundance_min={})",
        model.k(),
        dispatcher.workers(),
        config.abundance_min
    );
    let (counts, summary) = count_kmers(bank, &model, config, dispatcher)?;
    let solid = SolidKmerSet::from_counts(model, counts, config.abundance_min);
    info!(
        "Counted {} k-mers ({} distinct) in {} sequences; {} solid, {:.2}s",
        summary.kmers,
        summary.distinct,
        summary.sequences,
        solid.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(solid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::bank::StringBank;

    fn config(k: usize, abundance_min: u32) -> GraphConfig {
        GraphConfig {
            chunk_size: 2,
            ..GraphConfig::new(k, abundance_min)
        }
    }

    #[test]
    fn test_counts_match_naive_scan() {
        let seqs = ["ACGTACGTTGCA", "TTGCAACGT", "GGGGNGGGG", "AC", "acgtacg"];
        let model = KmerModel::new(4).unwrap();

        let mut naive = HashMap::new();
        for s in seqs {
            let upper = s.to_ascii_uppercase();
            for w in upper.as_bytes().windows(4) {
                if let Ok(x) = model.encode(w) {
                    *naive.entry(model.canonical(x).0).or_insert(0u32) += 1;
                }
            }
        }

        for workers in [1, 3] {
            let mut bank = StringBank::new(seqs);
            let (counts, summary) =
                count_kmers(&mut bank, &model, &config(4, 1), &Dispatcher::new(workers)).unwrap();
            assert_eq!(counts.len(), naive.len());
            for (kmer, n) in &naive {
                assert_eq!(counts.get(kmer), Some(n));
            }
            assert_eq!(summary.sequences, 5);
            assert_eq!(summary.kmers, naive.values().map(|&n| u64::from(n)).sum::<u64>());
        }
    }

    #[test]
    fn test_abundance_threshold() {
        // GGGG appears 4 times in the first read, ACGT once.
        let mut bank = StringBank::new(["GGGGGGG", "ACGT"]);
        let solid = build_solid_set(&mut bank, &config(4, 2), &Dispatcher::new(2)).unwrap();
        let model = KmerModel::new(4).unwrap();
        let gggg = model.canonical(model.encode(b"GGGG").unwrap()).0;
        assert_eq!(solid.len(), 1);
        assert_eq!(solid.abundance(gggg), Some(4));
    }

    #[test]
    fn test_invalid_config_reads_nothing() {
        let mut bank = StringBank::new(["ACGT"]);
        let err = build_solid_set(&mut bank, &config(0, 1), &Dispatcher::new(1)).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfiguration(_)));
        let mut chunk = SequenceChunk::new();
        assert!(bank.next_chunk(&mut chunk, 10).unwrap());
    }
}
