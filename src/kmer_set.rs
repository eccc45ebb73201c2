
extern crate log;

use std::sync::Arc;

use needletail::parse_fastx_file;
use rustc_hash::FxHashSet;

use crate::error::{Cli, Error, IO};
use crate::kmer_encoding::{canonical, encode, validate_k};

/// the largest k-mer length the dense counting table supports; the table
/// holds 4^k one-byte counters, so 15 already means a 1 GiB allocation
pub const MAX_COUNTING_K: u8 = 15;

/// The capability every corrector queries solidity through. Implementations
/// are frozen before correction starts and shared read-only across all
/// worker threads.
pub trait KmerSet: Sync + Send {
    /// Returns true if the k-mer is solid (trustworthy) in this set.
    /// The encoding may be in either orientation; lookups are canonical.
    fn get(&self, kmer: u64) -> bool;

    /// Returns the k-mer length this set was built with.
    fn k(&self) -> u8;
}

/// The shared read-only handle handed to correctors and worker threads.
pub type SharedKmerSet = Arc<dyn KmerSet>;

/// An exact, deduplicated set of solid k-mer encodings. Suited to trusted
/// sequence collections and any k up to the encoding limit.
pub struct HashKmerSet {
    set: FxHashSet<u64>,
    k: u8,
}

impl HashKmerSet {
    /// Creates an empty set for the given k-mer length.
    /// # Arguments
    /// * `k` - the k-mer length, validated against the encoding width
    pub fn new(k: u8) -> Result<Self, Error> {
        validate_k(k)?;
        Ok(Self {
            set: FxHashSet::default(),
            k,
        })
    }

    /// Marks every unambiguous k-mer of a sequence as solid.
    /// Windows containing non-nucleotide symbols are skipped, they can never be solid.
    /// # Arguments
    /// * `seq` - a trusted sequence
    pub fn insert_sequence(&mut self, seq: &[u8]) {
        if seq.len() < self.k as usize {
            return;
        }
        for window in seq.windows(self.k as usize) {
            if let Ok(kmer) = encode(window) {
                self.set.insert(canonical(kmer, self.k));
            }
        }
    }

    /// Builds a set from FASTA/FASTQ files of trusted sequences.
    /// # Arguments
    /// * `paths` - the sequence files to load
    /// * `k` - the k-mer length, validated against the encoding width
    pub fn from_files(paths: &[String], k: u8) -> Result<Self, Error> {
        let mut solid = Self::new(k)?;

        for path in paths {
            let mut reader = parse_fastx_file(path).map_err(|_| Error::IO(IO::CantOpenFile))?;
            while let Some(record) = reader.next() {
                let record = record.map_err(|_| Error::IO(IO::ErrorDuringRead))?;
                solid.insert_sequence(&record.seq());
            }
        }

        log::info!("loaded {} solid k-mers", solid.len());
        Ok(solid)
    }

    /// Returns the number of distinct solid k-mers.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Returns true if no k-mer has been marked solid.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl KmerSet for HashKmerSet {
    fn get(&self, kmer: u64) -> bool {
        self.set.contains(&canonical(kmer, self.k))
    }

    fn k(&self) -> u8 {
        self.k
    }
}

/// A dense table of saturating k-mer counts indexed by canonical encoding.
/// Together with a minimum abundance it backs `CountedKmerSet`.
pub struct KmerCounts {
    counts: Vec<u8>,
    k: u8,
}

impl KmerCounts {
    /// Allocates a zeroed count table for the given k-mer length.
    /// # Arguments
    /// * `k` - the k-mer length, bounded by `MAX_COUNTING_K`
    pub fn new(k: u8) -> Result<Self, Error> {
        if k == 0 || k > MAX_COUNTING_K {
            return Err(Error::Cli(Cli::KmerTooLarge));
        }
        Ok(Self {
            counts: vec![0; 1 << (2 * k)],
            k,
        })
    }

    /// Counts every unambiguous k-mer of a sequence, saturating at 255.
    /// # Arguments
    /// * `seq` - the sequence to count
    pub fn count_sequence(&mut self, seq: &[u8]) {
        if seq.len() < self.k as usize {
            return;
        }
        for window in seq.windows(self.k as usize) {
            if let Ok(kmer) = encode(window) {
                let index = canonical(kmer, self.k) as usize;
                self.counts[index] = self.counts[index].saturating_add(1);
            }
        }
    }

    /// Counts the k-mers of every record in the given FASTA/FASTQ files.
    /// # Arguments
    /// * `paths` - the sequence files to count
    pub fn count_files(&mut self, paths: &[String]) -> Result<(), Error> {
        for path in paths {
            let mut reader = parse_fastx_file(path).map_err(|_| Error::IO(IO::CantOpenFile))?;
            while let Some(record) = reader.next() {
                let record = record.map_err(|_| Error::IO(IO::ErrorDuringRead))?;
                self.count_sequence(&record.seq());
            }
        }
        Ok(())
    }

    /// Returns the count recorded for a k-mer, in either orientation.
    #[inline]
    pub fn get(&self, kmer: u64) -> u8 {
        self.counts[canonical(kmer, self.k) as usize]
    }

    /// Returns the k-mer length this table was built with.
    pub fn k(&self) -> u8 {
        self.k
    }

    /// Derives a solidity threshold from the count histogram: the first
    /// abundance where the histogram stops falling, which separates the
    /// error peak at low counts from the genuine coverage peak.
    /// Returns `None` for degenerate spectra with no such valley.
    pub fn first_minimum(&self) -> Option<u8> {
        let mut histogram: [u64; 256] = [0; 256];
        for &count in self.counts.iter() {
            if count > 0 {
                histogram[count as usize] += 1;
            }
        }

        for abundance in 1..255 {
            if histogram[abundance] < histogram[abundance + 1] {
                return Some(abundance as u8);
            }
        }
        None
    }
}

/// A count-table backed k-mer set: solid means counted at least
/// `abundance` times. The threshold is compared at lookup time.
pub struct CountedKmerSet {
    counts: KmerCounts,
    abundance: u8,
}

impl CountedKmerSet {
    /// Wraps a finished count table with a minimum abundance.
    /// # Arguments
    /// * `counts` - the count table, already populated
    /// * `abundance` - the minimum count for a k-mer to be considered solid
    pub fn new(counts: KmerCounts, abundance: u8) -> Self {
        Self { counts, abundance }
    }
}

impl KmerSet for CountedKmerSet {
    fn get(&self, kmer: u64) -> bool {
        self.counts.get(kmer) >= self.abundance
    }

    fn k(&self) -> u8 {
        self.counts.k()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer_encoding::encode;

    static SEQ: &[u8] = b"ACGTGGGAATTGTGGCCACATCACGAGGTCCTGCGTATTGACGACTGTAAAGCGAGTGGCCGTGGAATTTCAAGCTCAATTAGCCGAACCAATCCGCCTA";

    #[test]
    fn test_hash_forward() {
        let mut solid = HashKmerSet::new(11).unwrap();
        solid.insert_sequence(SEQ);

        let set: SharedKmerSet = Arc::new(solid);
        for window in SEQ.windows(11) {
            assert!(set.get(encode(window).unwrap()));
        }
    }

    #[test]
    fn test_hash_reverse_complement() {
        let mut solid = HashKmerSet::new(11).unwrap();
        solid.insert_sequence(SEQ);

        let set: SharedKmerSet = Arc::new(solid);
        let rev_comp = crate::kmer_encoding::reverse_complement_seq(SEQ);
        for window in rev_comp.windows(11) {
            assert!(set.get(encode(window).unwrap()));
        }
    }

    #[test]
    fn test_hash_absence() {
        let mut solid = HashKmerSet::new(11).unwrap();
        solid.insert_sequence(SEQ);

        assert!(!solid.get(encode(b"AAAAAAAAAAA").unwrap()));
    }

    #[test]
    fn test_hash_skips_ambiguity() {
        let mut solid = HashKmerSet::new(5).unwrap();
        solid.insert_sequence(b"ACGTNACGT");

        //every window overlaps the N, so nothing is solid
        assert!(solid.is_empty());
    }

    #[test]
    fn test_hash_rejects_large_k() {
        assert!(HashKmerSet::new(33).is_err());
    }

    #[test]
    fn test_counted_threshold() {
        let mut counts = KmerCounts::new(5).unwrap();
        counts.count_sequence(b"ACGTGGGAATT");
        counts.count_sequence(b"ACGTGGGAATT");
        counts.count_sequence(b"TTTAGCCAGGA");

        let set = CountedKmerSet::new(counts, 2);
        //seen twice, solid
        assert!(set.get(encode(b"ACGTG").unwrap()));
        //seen once, weak
        assert!(!set.get(encode(b"TTTAG").unwrap()));
        //never seen
        assert!(!set.get(encode(b"AAAAA").unwrap()));
        assert_eq!(set.k(), 5);
    }

    #[test]
    fn test_counted_reverse_complement() {
        let mut counts = KmerCounts::new(5).unwrap();
        counts.count_sequence(b"ACGTGGGAATT");

        let set = CountedKmerSet::new(counts, 1);
        let rev_comp = crate::kmer_encoding::reverse_complement_seq(b"ACGTG");
        assert!(set.get(encode(&rev_comp).unwrap()));
    }

    #[test]
    fn test_counting_rejects_large_k() {
        assert!(KmerCounts::new(MAX_COUNTING_K + 1).is_err());
    }

    #[test]
    fn test_first_minimum() {
        let mut counts = KmerCounts::new(7).unwrap();
        //a "coverage" sequence counted five times and an "error" sequence counted once;
        //the histogram valley sits between abundance 1 and abundance 5
        for _ in 0..5 {
            counts.count_sequence(b"ACGTGGGAATTGTGGCCACAT");
        }
        counts.count_sequence(b"TTACTGACCGATAAC");

        assert_eq!(counts.first_minimum(), Some(4));

        //an empty table has no valley to find
        let empty = KmerCounts::new(7).unwrap();
        assert_eq!(empty.first_minimum(), None);
    }
}
