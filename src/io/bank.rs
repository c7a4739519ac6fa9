//! Sequence banks: finite, single-pass sources of nucleotide strings read
//! during graph construction.
//!
//! A bank hands out sequences in chunks so counting can dispatch one chunk
//! at a time. Sequences are upper-cased on the way in; other symbols are
//! passed through for the counter to skip.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use paraseq::Record;
use paraseq::fastq;
use tracing::info;

/// A chunk of raw sequences.
pub type SequenceChunk = Vec<Vec<u8>>;

/// Single-pass source of nucleotide strings.
pub trait Bank {
    /// Replace the contents of `chunk` with up to `max` sequences.
    ///
    /// Returns `Ok(true)` if sequences were produced, `Ok(false)` once the
    /// bank is exhausted.
    fn next_chunk(&mut self, chunk: &mut SequenceChunk, max: usize) -> Result<bool>;
}

impl<B: Bank + ?Sized> Bank for &mut B {
    fn next_chunk(&mut self, chunk: &mut SequenceChunk, max: usize) -> Result<bool> {
        (**self).next_chunk(chunk, max)
    }
}

// ---------------------------------------------------------------------------
// StringBank
// ---------------------------------------------------------------------------

/// In-memory bank over owned strings.
#[derive(Debug, Clone, Default)]
pub struct StringBank {
    seqs: Vec<Vec<u8>>,
    pos: usize,
}

impl StringBank {
    pub fn new<I, S>(seqs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        Self {
            seqs: seqs
                .into_iter()
                .map(|s| s.as_ref().to_ascii_uppercase())
                .collect(),
            pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }
}

impl Bank for StringBank {
    fn next_chunk(&mut self, chunk: &mut SequenceChunk, max: usize) -> Result<bool> {
        chunk.clear();
        let end = self.seqs.len().min(self.pos.saturating_add(max.max(1)));
        chunk.extend(self.seqs[self.pos..end].iter().cloned());
        self.pos = end;
        Ok(!chunk.is_empty())
    }
}

// ---------------------------------------------------------------------------
// FastaBank
// ---------------------------------------------------------------------------

/// FASTA or FASTQ files, plain or compressed, read one after another.
///
/// Each file is sniffed independently from its first header (`>` or `@`).
/// FASTA records may span several lines. FASTQ goes through `paraseq`.
pub struct FastaBank {
    paths: Vec<PathBuf>,
    next_path: usize,
    current: Option<RecordReader>,
    records: u64,
}

impl FastaBank {
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        if paths.is_empty() {
            bail!("no input files specified");
        }
        let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        // Fail on a missing file before any counting starts.
        for path in &paths {
            if !path.exists() {
                bail!("input file {} does not exist", path.display());
            }
        }
        Ok(Self {
            paths,
            next_path: 0,
            current: None,
            records: 0,
        })
    }

    /// Records read so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    fn next_record(&mut self, seq: &mut Vec<u8>) -> Result<bool> {
        loop {
            if let Some(reader) = self.current.as_mut() {
                if reader.next_record(seq)? {
                    self.records += 1;
                    return Ok(true);
                }
                self.current = None;
            }
            let Some(path) = self.paths.get(self.next_path) else {
                return Ok(false);
            };
            self.next_path += 1;
            info!("Reading sequences from {}", path.display());
            self.current = Some(RecordReader::open(path)?);
        }
    }
}

impl Bank for FastaBank {
    fn next_chunk(&mut self, chunk: &mut SequenceChunk, max: usize) -> Result<bool> {
        chunk.clear();
        let mut seq = Vec::new();
        while chunk.len() < max.max(1) && self.next_record(&mut seq)? {
            chunk.push(std::mem::take(&mut seq));
        }
        Ok(!chunk.is_empty())
    }
}

type Input = BufReader<Box<dyn Read + Send>>;

/// Record parser over one decompressed file.
enum RecordReader {
    Fasta(FastaLines),
    Fastq(FastqRecords),
}

impl RecordReader {
    fn open(path: &Path) -> Result<Self> {
        let (reader, _format) = niffler::send::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut input = BufReader::with_capacity(1 << 20, reader);
        let first = skip_leading_whitespace(&mut input)
            .with_context(|| format!("reading {}", path.display()))?;

        if first == Some(b'@') {
            let reader = fastq::Reader::new(Box::new(input) as Box<dyn Read + Send>);
            let records = reader.new_record_set();
            return Ok(Self::Fastq(FastqRecords {
                reader,
                records,
                pending: VecDeque::new(),
                path: path.to_path_buf(),
            }));
        }
        Ok(Self::Fasta(FastaLines {
            input,
            path: path.to_path_buf(),
            line: Vec::new(),
            pending_header: false,
        }))
    }

    fn next_record(&mut self, seq: &mut Vec<u8>) -> Result<bool> {
        match self {
            Self::Fasta(r) => r.next_record(seq),
            Self::Fastq(r) => r.next_record(seq),
        }
    }
}

/// Consume leading blank space and return the first byte left, if any.
fn skip_leading_whitespace(input: &mut Input) -> std::io::Result<Option<u8>> {
    loop {
        let buf = input.fill_buf()?;
        let Some(pos) = buf.iter().position(|b| !b.is_ascii_whitespace()) else {
            if buf.is_empty() {
                return Ok(None);
            }
            let n = buf.len();
            input.consume(n);
            continue;
        };
        let first = buf[pos];
        input.consume(pos);
        return Ok(Some(first));
    }
}

/// FASTQ records in `paraseq` record sets, handed out one at a time.
struct FastqRecords {
    reader: fastq::Reader<Box<dyn Read + Send>>,
    records: fastq::RecordSet,
    pending: VecDeque<Vec<u8>>,
    path: PathBuf,
}

impl FastqRecords {
    fn next_record(&mut self, seq: &mut Vec<u8>) -> Result<bool> {
        loop {
            if let Some(next) = self.pending.pop_front() {
                *seq = next;
                return Ok(true);
            }
            let has = self
                .records
                .fill(&mut self.reader)
                .with_context(|| format!("reading {}", self.path.display()))?;
            if !has {
                return Ok(false);
            }
            for rec in self.records.iter() {
                let rec = rec.with_context(|| format!("reading {}", self.path.display()))?;
                self.pending.push_back(rec.seq().to_ascii_uppercase());
            }
        }
    }
}

/// Byte-oriented FASTA parser; headers are skipped without decoding.
struct FastaLines {
    input: Input,
    path: PathBuf,
    line: Vec<u8>,
    /// `line` holds a header that has not been consumed yet.
    pending_header: bool,
}

impl FastaLines {
    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        let n = self
            .input
            .read_until(b'\n', &mut self.line)
            .with_context(|| format!("reading {}", self.path.display()))?;
        while matches!(self.line.last(), Some(b'\n' | b'\r')) {
            self.line.pop();
        }
        Ok(n > 0)
    }

    fn next_record(&mut self, seq: &mut Vec<u8>) -> Result<bool> {
        seq.clear();
        if !self.pending_header {
            loop {
                if !self.read_line()? {
                    return Ok(false);
                }
                if !self.line.trim_ascii_end().is_empty() {
                    break;
                }
            }
        }
        self.pending_header = false;

        if self.line.first() != Some(&b'>') {
            bail!(
                "{}: expected a '>' header, found {:?}",
                self.path.display(),
                String::from_utf8_lossy(&self.line)
            );
        }
        loop {
            if !self.read_line()? {
                return Ok(true);
            }
            if self.line.first() == Some(&b'>') {
                self.pending_header = true;
                return Ok(true);
            }
            seq.extend(self.line.trim_ascii_end().iter().map(|b| b.to_ascii_uppercase()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use super::*;

    fn drain(bank: &mut dyn Bank, max: usize) -> Vec<Vec<String>> {
        let mut chunks = Vec::new();
        let mut chunk = SequenceChunk::new();
        while bank.next_chunk(&mut chunk, max).unwrap() {
            chunks.push(
                chunk
                    .iter()
                    .map(|s| String::from_utf8(s.clone()).unwrap())
                    .collect(),
            );
        }
        chunks
    }

    #[test]
    fn test_string_bank_chunks_and_uppercases() {
        let mut bank = StringBank::new(["acgt", "GGNA", "ttt"]);
        assert_eq!(bank.len(), 3);
        let chunks = drain(&mut bank, 2);
        assert_eq!(chunks, vec![vec!["ACGT", "GGNA"], vec!["TTT"]]);
        // Single pass.
        assert!(drain(&mut bank, 2).is_empty());
    }

    #[test]
    fn test_fasta_multiline_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fa");
        let mut f = File::create(&path).unwrap();
        writeln!(f, ">r1 first\nACGT\nacgt\n\n>r2\nTTTT\n>empty\n>r3\nGG").unwrap();
        drop(f);

        let mut bank = FastaBank::open(&[&path]).unwrap();
        let chunks = drain(&mut bank, 10);
        assert_eq!(chunks, vec![vec!["ACGTACGT", "TTTT", "", "GG"]]);
        assert_eq!(bank.records(), 4);
    }

    #[test]
    fn test_fastq_records_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let fq = dir.path().join("reads.fq");
        std::fs::write(&fq, "@a\nacgtn\n+\nIIIII\n@b\nGGCC\n+b\nIIII\n").unwrap();
        let fa = dir.path().join("more.fa");
        std::fs::write(&fa, ">c\nAAAA\n").unwrap();

        let mut bank = FastaBank::open(&[&fq, &fa]).unwrap();
        let chunks = drain(&mut bank, 2);
        assert_eq!(chunks, vec![vec!["ACGTN", "GGCC"], vec!["AAAA"]]);
    }

    #[test]
    fn test_fastq_record_sets_span_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let fq = dir.path().join("reads.fq");
        let mut f = File::create(&fq).unwrap();
        for (i, seq) in ["ACGT", "ccgg", "TTAA", "GATC", "AAAC"].iter().enumerate() {
            writeln!(f, "@r{i} sample\n{seq}\n+\n{}", "I".repeat(seq.len())).unwrap();
        }
        drop(f);

        let mut bank = FastaBank::open(&[&fq]).unwrap();
        let chunks = drain(&mut bank, 2);
        assert_eq!(
            chunks,
            vec![vec!["ACGT", "CCGG"], vec!["TTAA", "GATC"], vec!["AAAC"]]
        );
        assert_eq!(bank.records(), 5);
    }

    #[test]
    fn test_non_utf8_headers() {
        let dir = tempfile::tempdir().unwrap();
        let fa = dir.path().join("latin1.fa");
        std::fs::write(&fa, b">read \xb5 latin1\nACGTACGT\n").unwrap();
        let fq = dir.path().join("latin1.fq");
        std::fs::write(&fq, b"@read \xe9\nGGCA\n+\nIIII\n").unwrap();

        let mut bank = FastaBank::open(&[&fa, &fq]).unwrap();
        let chunks = drain(&mut bank, 10);
        assert_eq!(chunks, vec![vec!["ACGTACGT", "GGCA"]]);
    }

    #[test]
    fn test_fasta_leading_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let fa = dir.path().join("blank.fa");
        std::fs::write(&fa, "\n\n>r\r\nACGT\r\n").unwrap();
        let mut bank = FastaBank::open(&[&fa]).unwrap();
        assert_eq!(drain(&mut bank, 4), vec![vec!["ACGT"]]);
    }

    #[test]
    fn test_fasta_without_header_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let fa = dir.path().join("bad.fa");
        std::fs::write(&fa, "ACGT\n").unwrap();
        let mut bank = FastaBank::open(&[&fa]).unwrap();
        let mut chunk = SequenceChunk::new();
        assert!(bank.next_chunk(&mut chunk, 4).is_err());
    }

    #[test]
    fn test_string_bank_unbounded_chunk() {
        let mut bank = StringBank::new(["ACGTACGT", "TTGCA"]);
        let chunks = drain(&mut bank, usize::MAX);
        assert_eq!(chunks, vec![vec!["ACGTACGT", "TTGCA"]]);
    }

    #[test]
    fn test_missing_file_rejected_on_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FastaBank::open(&[dir.path().join("nope.fa")]).is_err());
        assert!(FastaBank::open::<PathBuf>(&[]).is_err());
    }
}
