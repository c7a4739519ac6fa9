//! The solid k-mer set: every canonical k-mer trusted as a graph node, with
//! its abundance.
//!
//! The graph consumes it through [`SolidKmers`] only: membership, abundance,
//! size, a stable rank per k-mer, and enumeration by rank. [`SolidKmerSet`]
//! is the exact in-memory implementation built by this crate's counter and
//! persisted next to the graph metadata.
//!
//! On-disk layout (`.solid`):
//!
//! ```text
//! [magic: 8 bytes "DBGSOL1\0"]
//! [k: u64 LE]
//! [count: u64 LE]
//! [entries: count × {kmer: u64 LE, abundance: u32 LE}]   sorted by kmer
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ahash::RandomState;
use anyhow::{Context, bail};
use tracing::info;

use super::kmer::KmerModel;
use crate::error::{GraphError, Result};

// ---------------------------------------------------------------------------
// Oracle contract
// ---------------------------------------------------------------------------

/// Read-only view of a solid k-mer set, shared across dispatch workers.
///
/// Ranks are `0..len()`; `get(index_of(x)?) == Some((x, abundance(x)?))`.
pub trait SolidKmers: Send + Sync {
    /// Width of the stored k-mers.
    fn kmer_size(&self) -> usize;

    /// Number of solid k-mers.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stable rank of a present canonical k-mer.
    fn index_of(&self, kmer: u64) -> Option<u64>;

    /// The k-mer and abundance at `rank`.
    fn get(&self, rank: u64) -> Option<(u64, u32)>;

    fn contains(&self, kmer: u64) -> bool {
        self.index_of(kmer).is_some()
    }

    /// Abundance of a present k-mer.
    fn abundance(&self, kmer: u64) -> Option<u32> {
        self.get(self.index_of(kmer)?).map(|(_, a)| a)
    }
}

// ---------------------------------------------------------------------------
// Fixed hash state for deterministic lookups
// ---------------------------------------------------------------------------

pub(crate) fn fixed_hash_state() -> RandomState {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
}

type RankMap = HashMap<u64, u64, RandomState>;

// ---------------------------------------------------------------------------
// SolidKmerSet
// ---------------------------------------------------------------------------

const SOLID_MAGIC: &[u8; 8] = b"DBGSOL1\0";

/// Sorted canonical k-mers with abundances, plus a hash index for rank
/// lookups. The rank of a k-mer is its position in sorted order.
pub struct SolidKmerSet {
    model: KmerModel,
    kmers: Vec<u64>,
    abundances: Vec<u32>,
    ranks: RankMap,
}

impl SolidKmerSet {
    /// Build from `(canonical k-mer, count)` pairs, keeping those whose count
    /// reaches `abundance_min`. Repeated k-mers have their counts summed.
    pub fn from_counts<I>(model: KmerModel, counts: I, abundance_min: u32) -> Self
    where
        I: IntoIterator<Item = (u64, u32)>,
    {
        let mut entries: Vec<(u64, u32)> = counts.into_iter().collect();
        entries.sort_unstable_by_key(|&(kmer, _)| kmer);

        let mut kmers: Vec<u64> = Vec::with_capacity(entries.len());
        let mut abundances: Vec<u32> = Vec::with_capacity(entries.len());
        for (kmer, count) in entries {
            debug_assert_eq!(kmer & !model.mask(), 0);
            if kmers.last() == Some(&kmer) {
                if let Some(last) = abundances.last_mut() {
                    *last = u32::saturating_add(*last, count);
                }
            } else {
                kmers.push(kmer);
                abundances.push(count);
            }
        }

        // Threshold after merging so split counts still qualify.
        let mut w = 0;
        for r in 0..kmers.len() {
            if abundances[r] >= abundance_min {
                kmers[w] = kmers[r];
                abundances[w] = abundances[r];
                w += 1;
            }
        }
        kmers.truncate(w);
        abundances.truncate(w);

        Self::from_sorted(model, kmers, abundances)
    }

    fn from_sorted(model: KmerModel, mut kmers: Vec<u64>, mut abundances: Vec<u32>) -> Self {
        kmers.shrink_to_fit();
        abundances.shrink_to_fit();
        let mut ranks: RankMap = HashMap::with_capacity_and_hasher(kmers.len(), fixed_hash_state());
        for (rank, &kmer) in kmers.iter().enumerate() {
            ranks.insert(kmer, rank as u64);
        }
        Self {
            model,
            kmers,
            abundances,
            ranks,
        }
    }

    pub fn model(&self) -> &KmerModel {
        &self.model
    }

    /// Sum of all abundances.
    pub fn total_abundance(&self) -> u64 {
        self.abundances.iter().map(|&a| u64::from(a)).sum()
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Serialize to a writer.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut w = BufWriter::new(writer);
        w.write_all(SOLID_MAGIC)?;
        w.write_all(&(self.model.k() as u64).to_le_bytes())?;
        w.write_all(&(self.kmers.len() as u64).to_le_bytes())?;
        for (&kmer, &abundance) in self.kmers.iter().zip(&self.abundances) {
            w.write_all(&kmer.to_le_bytes())?;
            w.write_all(&abundance.to_le_bytes())?;
        }
        w.flush()?;
        Ok(())
    }

    /// Write to `path`, creating or truncating it.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        self.save(&mut file)?;
        info!("Saved {} solid k-mers to {}", self.kmers.len(), path.display());
        Ok(())
    }

    /// Deserialize from a reader.
    pub fn load<R: Read>(reader: &mut R) -> anyhow::Result<Self> {
        let mut r = BufReader::new(reader);

        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)
            .context("failed to read solid k-mer magic")?;
        if magic != *SOLID_MAGIC {
            bail!(
                "invalid solid k-mer magic: expected {:?}, got {:?}",
                SOLID_MAGIC,
                magic
            );
        }

        let k = read_u64_le(&mut r).context("failed to read k")? as usize;
        let model = KmerModel::new(k).context("invalid k-mer size in header")?;
        let count = read_u64_le(&mut r).context("failed to read k-mer count")?;

        let mut kmers: Vec<u64> = Vec::with_capacity(count.min(1 << 24) as usize);
        let mut abundances: Vec<u32> = Vec::with_capacity(count.min(1 << 24) as usize);
        for i in 0..count {
            let kmer = read_u64_le(&mut r)
                .with_context(|| format!("truncated entry {i} of {count}"))?;
            let abundance = read_u32_le(&mut r)
                .with_context(|| format!("truncated entry {i} of {count}"))?;
            if kmer & !model.mask() != 0 {
                bail!("entry {i}: k-mer 0x{kmer:x} is wider than k={k}");
            }
            if model.canonical(kmer).0 != kmer {
                bail!("entry {i}: k-mer 0x{kmer:x} is not canonical");
            }
            if kmers.last().is_some_and(|&prev| prev >= kmer) {
                bail!("entry {i}: k-mers are not strictly increasing");
            }
            kmers.push(kmer);
            abundances.push(abundance);
        }

        Ok(Self::from_sorted(model, kmers, abundances))
    }

    /// Open and deserialize `path`. Any failure is `OracleUnavailable`.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| GraphError::oracle(path, e.to_string()))?;
        let mut reader = BufReader::new(file);
        let set = Self::load(&mut reader).map_err(|e| GraphError::oracle(path, format!("{e:#}")))?;
        info!(
            "Loaded {} solid k-mers (k={}) from {}",
            set.kmers.len(),
            set.model.k(),
            path.display()
        );
        Ok(set)
    }
}

impl SolidKmers for SolidKmerSet {
    fn kmer_size(&self) -> usize {
        self.model.k()
    }

    #[inline]
    fn len(&self) -> u64 {
        self.kmers.len() as u64
    }

    #[inline]
    fn index_of(&self, kmer: u64) -> Option<u64> {
        self.ranks.get(&kmer).copied()
    }

    #[inline]
    fn get(&self, rank: u64) -> Option<(u64, u32)> {
        let rank = usize::try_from(rank).ok()?;
        Some((*self.kmers.get(rank)?, self.abundances[rank]))
    }
}

impl std::fmt::Debug for SolidKmerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolidKmerSet")
            .field("k", &self.model.k())
            .field("len", &self.kmers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

fn read_u64_le<R: Read>(reader: &mut R) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_u32_le<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> KmerModel {
        KmerModel::new(4).unwrap()
    }

    #[test]
    fn test_threshold_and_ranks() {
        let set = SolidKmerSet::from_counts(model(), vec![(9, 1), (3, 5), (200, 2), (7, 2)], 2);
        assert_eq!(set.len(), 3);
        assert!(!set.contains(9));
        assert_eq!(set.get(0), Some((3, 5)));
        assert_eq!(set.get(1), Some((7, 2)));
        assert_eq!(set.get(2), Some((200, 2)));
        assert_eq!(set.get(3), None);
        assert_eq!(set.index_of(200), Some(2));
        assert_eq!(set.abundance(7), Some(2));
        assert_eq!(set.abundance(9), None);
        assert_eq!(set.total_abundance(), 9);
    }

    #[test]
    fn test_repeated_counts_merge_before_threshold() {
        let set = SolidKmerSet::from_counts(model(), vec![(5, 1), (5, 1), (6, 1)], 2);
        assert_eq!(set.len(), 1);
        assert_eq!(set.abundance(5), Some(2));
    }

    #[test]
    fn test_ranks_agree_with_enumeration() {
        let counts: Vec<(u64, u32)> = (0..256u64).step_by(3).map(|k| (k, 1 + (k % 4) as u32)).collect();
        let set = SolidKmerSet::from_counts(model(), counts, 1);
        for rank in 0..set.len() {
            let (kmer, abundance) = set.get(rank).unwrap();
            assert_eq!(set.index_of(kmer), Some(rank));
            assert_eq!(set.abundance(kmer), Some(abundance));
        }
    }

    #[test]
    fn test_serialization_roundtrip() {
        let set = SolidKmerSet::from_counts(model(), vec![(1, 3), (17, 4), (60, 1)], 1);
        let mut buf = Vec::new();
        set.save(&mut buf).unwrap();
        assert_eq!(buf.len(), 8 + 8 + 8 + 3 * 12);

        let loaded = SolidKmerSet::load(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded.kmer_size(), 4);
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(1), Some((17, 4)));
        assert_eq!(loaded.index_of(60), Some(2));
    }

    #[test]
    fn test_load_rejects_corruption() {
        let set = SolidKmerSet::from_counts(model(), vec![(1, 3), (17, 4)], 1);
        let mut buf = Vec::new();
        set.save(&mut buf).unwrap();

        let mut bad_magic = buf.clone();
        bad_magic[0] = b'X';
        assert!(SolidKmerSet::load(&mut bad_magic.as_slice()).is_err());

        let truncated = &buf[..buf.len() - 3];
        let err = SolidKmerSet::load(&mut &truncated[..]).unwrap_err();
        assert!(format!("{err:#}").contains("truncated entry 1"));

        // Swap the two entries so order breaks.
        let mut unsorted = buf.clone();
        let (_, body) = unsorted.split_at_mut(24);
        let (a, b) = body.split_at_mut(12);
        a.swap_with_slice(b);
        let err = SolidKmerSet::load(&mut unsorted.as_slice()).unwrap_err();
        assert!(err.to_string().contains("not strictly increasing"));
    }

    #[test]
    fn test_load_rejects_non_canonical() {
        // TTTT (0xff) is stored as AAAA by every writer.
        let m = model();
        assert_eq!(m.canonical(0xff).0, 0);
        let set = SolidKmerSet::from_counts(m, vec![(1, 3), (0xff, 2)], 1);
        let mut buf = Vec::new();
        set.save(&mut buf).unwrap();
        let err = SolidKmerSet::load(&mut buf.as_slice()).unwrap_err();
        assert!(err.to_string().contains("not canonical"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.solid");
        std::fs::write(&path, &buf).unwrap();
        let err = SolidKmerSet::load_from_path(&path).unwrap_err();
        assert!(matches!(err, GraphError::OracleUnavailable { .. }));
    }

    #[test]
    fn test_load_missing_path_is_oracle_unavailable() {
        let err = SolidKmerSet::load_from_path(Path::new("/nonexistent/graph.solid")).unwrap_err();
        assert!(matches!(err, GraphError::OracleUnavailable { .. }));
    }
}
