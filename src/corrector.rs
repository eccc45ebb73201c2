
extern crate log;

use log::debug;

use crate::kmer_encoding::{add_base, is_nucleotide, nuc_to_bits};
use crate::kmer_set::KmerSet;

/// The contract every correction strategy implements. A corrector validates
/// edits against a shared read-only `KmerSet` and never partially mutates a
/// read: `correct_error` either returns a complete local repair or nothing.
pub trait Corrector: Sync + Send {
    /// Returns the k-mer set this corrector validates against.
    fn valid_kmer(&self) -> &dyn KmerSet;

    /// Attempts to repair the error ending at the last symbol of `kmer`.
    /// `seq` is the read suffix starting at that symbol. On success returns
    /// the replacement symbols and how many read symbols they consume.
    fn correct_error(&self, kmer: u64, seq: &[u8]) -> Option<(Vec<u8>, usize)>;

    /// Returns the k-mer length used for validation.
    fn k(&self) -> u8 {
        self.valid_kmer().k()
    }

    /// Scans the read left to right, repairing the first weak k-mer after a
    /// solid one and resuming just past each repaired region. Windows
    /// containing ambiguous symbols are never solid and never anchor a repair.
    fn correct(&self, seq: &[u8]) -> Vec<u8> {
        let k = self.k() as usize;
        if seq.len() < k {
            return seq.to_vec();
        }

        let mut corrected: Vec<u8> = Vec::with_capacity(seq.len());
        corrected.extend_from_slice(&seq[0..k]);

        let mut kmer: u64 = 0;
        let mut ambiguous: usize = 0;
        for &nuc in &seq[0..k] {
            kmer = add_base(kmer, nuc_to_bits(nuc), self.k());
            ambiguous = if is_nucleotide(nuc) {
                ambiguous.saturating_sub(1)
            } else {
                k
            };
        }

        let mut previous = ambiguous == 0 && self.valid_kmer().get(kmer);
        //bounds runs of zero-advance repairs, a run of pure insertions longer than k is never trustworthy
        let mut stall: usize = 0;
        let mut i = k;
        while i < seq.len() {
            let nuc = seq[i];

            kmer = add_base(kmer, nuc_to_bits(nuc), self.k());
            ambiguous = if is_nucleotide(nuc) {
                ambiguous.saturating_sub(1)
            } else {
                k
            };
            let solid = ambiguous == 0 && self.valid_kmer().get(kmer);

            if !solid && previous {
                match self.correct_error(kmer, &seq[i..]) {
                    Some((local_correct, offset)) if offset > 0 || stall < k => {
                        kmer >>= 2;
                        for nuc in local_correct {
                            kmer = add_base(kmer, nuc_to_bits(nuc), self.k());
                            corrected.push(nuc);
                        }

                        debug!("error at position {} corrected", i);

                        stall = if offset == 0 { stall + 1 } else { 0 };
                        previous = true;
                        ambiguous = 0;
                        i += offset;
                    }
                    _ => {
                        corrected.push(nuc);

                        debug!("error at position {} not corrected", i);

                        stall = 0;
                        previous = false;
                        i += 1;
                    }
                }
            } else {
                previous = solid;
                corrected.push(nuc);

                stall = 0;
                i += 1;
            }
        }

        corrected
    }
}

/// Returns the symbols that make the *last* position of `ori` solid when
/// substituted in, in fixed A<C<G<T order.
pub(crate) fn alt_nucs(valid_kmer: &dyn KmerSet, ori: u64) -> Vec<u64> {
    next_nucs(valid_kmer, ori >> 2)
}

/// Returns the symbols that extend `kmer` into a solid successor, in fixed
/// A<C<G<T order.
pub(crate) fn next_nucs(valid_kmer: &dyn KmerSet, kmer: u64) -> Vec<u64> {
    let mut correct_nuc: Vec<u64> = Vec::with_capacity(4);

    for alt_nuc in 0..4 {
        if valid_kmer.get(add_base(kmer, alt_nuc, valid_kmer.k())) {
            correct_nuc.push(alt_nuc);
        }
    }

    correct_nuc
}

/// Walks the read suffix until the rolling k-mer becomes solid again.
/// Returns how many symbols were consumed and the first solid k-mer found;
/// if the suffix runs out first, the returned k-mer is not solid.
pub(crate) fn error_len(subseq: &[u8], mut kmer: u64, valid_kmer: &dyn KmerSet) -> (usize, u64) {
    let mut j = 0;

    loop {
        j += 1;

        if j >= subseq.len() {
            break;
        }

        kmer = add_base(kmer, nuc_to_bits(subseq[j]), valid_kmer.k());

        if valid_kmer.get(kmer) {
            break;
        }
    }

    (j, kmer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::kmer_encoding::encode;
    use crate::kmer_set::{HashKmerSet, SharedKmerSet};

    fn solid_set(sequences: &[&[u8]], k: u8) -> SharedKmerSet {
        let mut solid = HashKmerSet::new(k).unwrap();
        for seq in sequences {
            solid.insert_sequence(seq);
        }
        Arc::new(solid)
    }

    #[test]
    fn test_found_alt_nucs() {
        let set = solid_set(&[b"ACTGA", b"ACTGT"], 5);

        let kmer = encode(b"ACTGC").unwrap();
        assert_eq!(alt_nucs(set.as_ref(), kmer), vec![0, 3]);
    }

    #[test]
    fn test_next_nucs() {
        let set = solid_set(&[b"ACTGAC"], 5);

        let kmer = encode(b"ACTGA").unwrap();
        assert_eq!(next_nucs(set.as_ref(), kmer), vec![1]);
    }

    #[test]
    fn test_error_len_reconnects() {
        let refe = b"GATACATGGACACTAGTATG";
        let set = solid_set(&[refe], 5);

        //the read drops the C at position 10, the first weak window is TGGAA
        let read = b"GATACATGGAACTAGTATG";
        let kmer = encode(b"TGGAA").unwrap();
        let (len, first_solid) = error_len(&read[10..], kmer, set.as_ref());

        assert_eq!(len, 4);
        assert_eq!(first_solid, encode(b"ACTAG").unwrap());
        assert!(set.get(first_solid));
    }

    #[test]
    fn test_error_len_runs_out() {
        let set = solid_set(&[b"ACTGACGAC"], 5);

        let kmer = encode(b"TTTTT").unwrap();
        let (len, last) = error_len(b"TTTT", kmer, set.as_ref());

        assert_eq!(len, 4);
        assert!(!set.get(last));
    }
}
