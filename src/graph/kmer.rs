//! 2-bit k-mer packing, reverse complement and canonical forms.
//!
//! A k-mer of width `k` (1..=32) is packed into the low `2k` bits of a `u64`,
//! first nucleotide in the most significant position:
//!
//! ```text
//! "ACGT" -> 00 01 10 11 -> 0b0001_1011
//! ```
//!
//! With `A=0, C=1, G=2, T=3`, complementing a base is `code ^ 3`, and the
//! numeric order of packed values equals the lexicographic order of the
//! strings. The canonical form of a k-mer is the smaller of its forward and
//! reverse-complement encodings; a palindrome's two encodings are equal, so
//! it always canonicalizes to itself in the forward orientation.

use std::fmt;

use crate::error::{GraphError, Result};

/// Largest supported k-mer width (2 bits × 32 = 64 bits).
pub const MAX_KMER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Nucleotide
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Nucleotide {
    A = 0,
    C = 1,
    G = 2,
    T = 3,
}

impl Nucleotide {
    pub const ALL: [Nucleotide; 4] = [Self::A, Self::C, Self::G, Self::T];

    /// Decode from the 2-bit representation (upper bits ignored).
    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        Self::ALL[(bits & 0x3) as usize]
    }

    #[inline]
    pub fn to_bits(self) -> u64 {
        self as u64
    }

    /// Parse an ASCII base, either case.
    #[inline]
    pub fn from_ascii(b: u8) -> Option<Self> {
        match b {
            b'A' | b'a' => Some(Self::A),
            b'C' | b'c' => Some(Self::C),
            b'G' | b'g' => Some(Self::G),
            b'T' | b't' => Some(Self::T),
            _ => None,
        }
    }

    #[inline]
    pub fn to_ascii(self) -> u8 {
        b"ACGT"[self as usize]
    }

    /// A↔T, C↔G.
    #[inline]
    pub fn complement(self) -> Self {
        Self::from_bits(self.to_bits() ^ 3)
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ascii() as char)
    }
}

// ---------------------------------------------------------------------------
// Strand
// ---------------------------------------------------------------------------

/// Which encoding of a canonical k-mer the caller is reading.
///
/// `Forward` means the caller's oriented sequence is the canonical k-mer
/// itself; `Reverse` means it is the canonical k-mer's reverse complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

// ---------------------------------------------------------------------------
// KmerModel
// ---------------------------------------------------------------------------

/// Packing parameters shared by every k-mer of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerModel {
    k: usize,
    mask: u64,
}

impl KmerModel {
    /// Model for width `k`. Fails unless `1 <= k <= 32`.
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 || k > MAX_KMER_SIZE {
            return Err(GraphError::InvalidConfiguration(format!(
                "k-mer size must be in 1..={MAX_KMER_SIZE}, got {k}"
            )));
        }
        let mask = if k >= 32 {
            u64::MAX
        } else {
            (1u64 << (2 * k)) - 1
        };
        Ok(Self { k, mask })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Mask covering the low `2k` bits.
    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Pack exactly `k` ASCII nucleotides.
    ///
    /// Fails with `MalformedSequence` on any symbol outside ACGT, and with
    /// `InvalidConfiguration` if the window length is not `k`.
    pub fn encode(&self, window: &[u8]) -> Result<u64> {
        if window.len() != self.k {
            return Err(GraphError::InvalidConfiguration(format!(
                "k-mer window has length {}, expected {}",
                window.len(),
                self.k
            )));
        }
        let mut kmer = 0u64;
        for (position, &b) in window.iter().enumerate() {
            let nt = Nucleotide::from_ascii(b).ok_or(GraphError::MalformedSequence {
                symbol: b as char,
                position,
            })?;
            kmer = (kmer << 2) | nt.to_bits();
        }
        Ok(kmer)
    }

    /// ASCII form of a packed k-mer.
    pub fn decode(&self, kmer: u64) -> String {
        (0..self.k)
            .map(|i| self.nucleotide_at(kmer, i).to_ascii() as char)
            .collect()
    }

    /// The `i`-th nucleotide (0 = first, most significant).
    #[inline]
    pub fn nucleotide_at(&self, kmer: u64, i: usize) -> Nucleotide {
        debug_assert!(i < self.k);
        Nucleotide::from_bits(kmer >> (2 * (self.k - 1 - i)))
    }

    /// Reverse complement within the k-mer width.
    #[inline]
    pub fn reverse_complement(&self, kmer: u64) -> u64 {
        debug_assert!(kmer & !self.mask == 0);
        let mut x = !kmer;
        // Reverse the order of the 2-bit groups in the whole word.
        x = ((x >> 2) & 0x3333_3333_3333_3333) | ((x & 0x3333_3333_3333_3333) << 2);
        x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0F) | ((x & 0x0F0F_0F0F_0F0F_0F0F) << 4);
        x = x.swap_bytes();
        x >> (64 - 2 * self.k)
    }

    /// Canonical form of `kmer` and the strand `kmer` sits on relative to it.
    #[inline]
    pub fn canonical(&self, kmer: u64) -> (u64, Strand) {
        let rc = self.reverse_complement(kmer);
        if kmer <= rc {
            (kmer, Strand::Forward)
        } else {
            (rc, Strand::Reverse)
        }
    }

    /// The sequence a caller on `strand` reads for canonical k-mer `canonical`.
    #[inline]
    pub fn oriented(&self, canonical: u64, strand: Strand) -> u64 {
        match strand {
            Strand::Forward => canonical,
            Strand::Reverse => self.reverse_complement(canonical),
        }
    }

    /// Append `nt` on the 3' end, dropping the first nucleotide.
    #[inline]
    pub fn push_back(&self, kmer: u64, nt: Nucleotide) -> u64 {
        ((kmer << 2) | nt.to_bits()) & self.mask
    }

    /// Prepend `nt` on the 5' end, dropping the last nucleotide.
    #[inline]
    pub fn push_front(&self, kmer: u64, nt: Nucleotide) -> u64 {
        (kmer >> 2) | (nt.to_bits() << (2 * (self.k - 1)))
    }

    /// Canonical k-mers of every ACGT-only window of `seq`, left to right.
    pub fn canonical_kmers<'a>(&self, seq: &'a [u8]) -> CanonicalKmers<'a> {
        CanonicalKmers {
            model: *self,
            seq,
            pos: 0,
            fw: 0,
            rc: 0,
            valid: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Rolling canonical k-mer scanner
// ---------------------------------------------------------------------------

/// Canonical k-mers of a raw sequence with their start offsets.
///
/// Forward and reverse-complement encodings are rolled together. A symbol
/// outside ACGT restarts the window, so no yielded k-mer spans one.
pub struct CanonicalKmers<'a> {
    model: KmerModel,
    seq: &'a [u8],
    pos: usize,
    fw: u64,
    rc: u64,
    valid: usize,
}

impl Iterator for CanonicalKmers<'_> {
    /// `(start offset, canonical k-mer)`.
    type Item = (usize, u64);

    fn next(&mut self) -> Option<(usize, u64)> {
        let k = self.model.k;
        while self.pos < self.seq.len() {
            let b = self.seq[self.pos];
            self.pos += 1;
            let Some(nt) = Nucleotide::from_ascii(b) else {
                self.valid = 0;
                self.fw = 0;
                self.rc = 0;
                continue;
            };
            self.fw = self.model.push_back(self.fw, nt);
            self.rc = self.model.push_front(self.rc, nt.complement());
            self.valid += 1;
            if self.valid >= k {
                return Some((self.pos - k, self.fw.min(self.rc)));
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_revcomp(s: &str) -> String {
        s.bytes()
            .rev()
            .map(|b| match b {
                b'A' => 'T',
                b'C' => 'G',
                b'G' => 'C',
                b'T' => 'A',
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_nucleotide_roundtrip() {
        for nt in Nucleotide::ALL {
            assert_eq!(Nucleotide::from_bits(nt.to_bits()), nt);
            assert_eq!(Nucleotide::from_ascii(nt.to_ascii()), Some(nt));
            assert_eq!(nt.complement().complement(), nt);
        }
        assert_eq!(Nucleotide::A.complement(), Nucleotide::T);
        assert_eq!(Nucleotide::C.complement(), Nucleotide::G);
        assert_eq!(Nucleotide::from_ascii(b'g'), Some(Nucleotide::G));
        assert_eq!(Nucleotide::from_ascii(b'N'), None);
    }

    #[test]
    fn test_model_rejects_bad_k() {
        assert!(matches!(KmerModel::new(0), Err(GraphError::InvalidConfiguration(_))));
        assert!(matches!(KmerModel::new(33), Err(GraphError::InvalidConfiguration(_))));
        assert_eq!(KmerModel::new(32).unwrap().mask(), u64::MAX);
        assert_eq!(KmerModel::new(4).unwrap().mask(), 0xFF);
    }

    #[test]
    fn test_encode_decode() {
        let m = KmerModel::new(4).unwrap();
        assert_eq!(m.encode(b"ACGT").unwrap(), 0b0001_1011);
        assert_eq!(m.encode(b"acgt").unwrap(), 0b0001_1011);
        assert_eq!(m.decode(0b0001_1011), "ACGT");
        assert_eq!(m.nucleotide_at(0b0001_1011, 0), Nucleotide::A);
        assert_eq!(m.nucleotide_at(0b0001_1011, 3), Nucleotide::T);
    }

    #[test]
    fn test_encode_malformed() {
        let m = KmerModel::new(4).unwrap();
        match m.encode(b"ACNT") {
            Err(GraphError::MalformedSequence { symbol, position }) => {
                assert_eq!(symbol, 'N');
                assert_eq!(position, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(m.encode(b"ACG"), Err(GraphError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_reverse_complement_matches_strings() {
        for (k, s) in [
            (1, "A"),
            (4, "AATG"),
            (5, "GATTC"),
            (11, "ACGTTGCAAGT"),
            (31, "ACGTACGTTTGACCAGTACGATCAGGATCAA"),
            (32, "TTGACCAGTACGATCAGGATCAAACGTACGTA"),
        ] {
            let m = KmerModel::new(k).unwrap();
            let x = m.encode(s.as_bytes()).unwrap();
            assert_eq!(m.decode(m.reverse_complement(x)), naive_revcomp(s), "k={k}");
            assert_eq!(m.reverse_complement(m.reverse_complement(x)), x);
        }
    }

    #[test]
    fn test_canonical_idempotent_and_strand_invariant() {
        for k in [1usize, 3, 4, 7, 15, 31, 32] {
            let m = KmerModel::new(k).unwrap();
            let mut x: u64 = 0x9E37_79B9_7F4A_7C15 & m.mask();
            for _ in 0..200 {
                let (c, _) = m.canonical(x);
                assert_eq!(m.canonical(c), (c, Strand::Forward));
                assert_eq!(m.canonical(m.reverse_complement(x)).0, c);
                x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407) & m.mask();
            }
        }
    }

    #[test]
    fn test_canonical_strand_tag() {
        let m = KmerModel::new(4).unwrap();
        let aatg = m.encode(b"AATG").unwrap();
        let catt = m.encode(b"CATT").unwrap();
        assert_eq!(m.canonical(aatg), (aatg, Strand::Forward));
        assert_eq!(m.canonical(catt), (aatg, Strand::Reverse));
        assert_eq!(m.oriented(aatg, Strand::Reverse), catt);

        // Palindromes are their own reverse complement.
        let acgt = m.encode(b"ACGT").unwrap();
        assert_eq!(m.canonical(acgt), (acgt, Strand::Forward));
    }

    #[test]
    fn test_push_front_and_back() {
        let m = KmerModel::new(4).unwrap();
        let aatg = m.encode(b"AATG").unwrap();
        assert_eq!(m.decode(m.push_back(aatg, Nucleotide::C)), "ATGC");
        assert_eq!(m.decode(m.push_front(aatg, Nucleotide::G)), "GAAT");
    }

    #[test]
    fn test_canonical_kmers_skip_invalid_windows() {
        let m = KmerModel::new(3).unwrap();
        let got: Vec<(usize, String)> = m
            .canonical_kmers(b"ACGTNGGA")
            .map(|(pos, c)| (pos, m.decode(c)))
            .collect();
        // ACG, CGT(=ACG rc), [N breaks], GGA -> TCC rc, GGA < TCC
        assert_eq!(
            got,
            vec![
                (0, "ACG".to_string()),
                (1, "ACG".to_string()),
                (5, "GGA".to_string()),
            ]
        );
    }
}
