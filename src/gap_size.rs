
extern crate log;

use log::debug;

use crate::corrector::{alt_nucs, error_len, next_nucs, Corrector};
use crate::exist::Exist;
use crate::graph::Graph;
use crate::kmer_encoding::{add_base, bits_to_nuc};
use crate::kmer_set::{KmerSet, SharedKmerSet};

/// Corrects by first measuring the weak region against the k-mer chain
/// length a single error would produce: shorter regions go to the local
/// graph walk, exact-length regions to the scenario catalogue, and longer
/// regions are closed substitution by substitution over the inferred gap.
pub struct GapSize {
    valid_kmer: SharedKmerSet,
    graph: Graph,
    exist: Exist,
}

impl GapSize {
    /// Creates the corrector over a shared k-mer set.
    /// # Arguments
    /// * `valid_kmer` - the solid k-mer set to validate edits against
    /// * `c` - the confirmation count handed to the scenario search
    /// * `max_search` - the walk bound handed to the graph search
    pub fn new(valid_kmer: SharedKmerSet, c: u8, max_search: u8) -> Self {
        Self {
            graph: Graph::new(valid_kmer.clone(), max_search),
            exist: Exist::new(valid_kmer.clone(), c),
            valid_kmer,
        }
    }

    /// Closes a gap longer than k by committing the unique solid successor at
    /// every step; any branching or dead end abandons the repair whole.
    pub fn ins_sub_correction(&self, kmer: u64, gap_size: usize) -> Option<(Vec<u8>, usize)> {
        let set = self.valid_kmer.as_ref();

        let mut alts = alt_nucs(set, kmer);
        if alts.len() != 1 {
            debug!("not one alternative {:?}", alts);
            return None;
        }

        let mut corr = add_base(kmer >> 2, alts[0], self.k());
        let mut local_corr = vec![bits_to_nuc(alts[0])];

        for step in 0..gap_size {
            alts = next_nucs(set, corr);

            if alts.len() != 1 {
                debug!("branching successor {:?} at step {}", alts, step);
                return None;
            }

            corr = add_base(corr, alts[0], self.k());
            local_corr.push(bits_to_nuc(alts[0]));
        }

        let offset = local_corr.len();
        Some((local_corr, offset))
    }
}

impl Corrector for GapSize {
    fn valid_kmer(&self) -> &dyn KmerSet {
        self.valid_kmer.as_ref()
    }

    fn correct_error(&self, kmer: u64, seq: &[u8]) -> Option<(Vec<u8>, usize)> {
        let (gap_len, _first_solid) = error_len(seq, kmer, self.valid_kmer());
        debug!("weak region of length {}", gap_len);

        let k = self.k() as usize;
        if gap_len < k {
            self.graph.correct_error(kmer, seq)
        } else if gap_len == k {
            self.exist.correct_error(kmer, seq)
        } else {
            self.ins_sub_correction(kmer, gap_len - k)
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use std::sync::Arc;

    use crate::kmer_set::HashKmerSet;

    fn solid_set(sequences: &[&[u8]], k: u8) -> SharedKmerSet {
        let mut solid = HashKmerSet::new(k).unwrap();
        for seq in sequences {
            solid.insert_sequence(seq);
        }
        Arc::new(solid)
    }

    #[test]
    fn csc() {
        let refe = b"AGCGTATCTT";
        let read = b"AGCGTTTCTT";

        let corrector = GapSize::new(solid_set(&[refe], 5), 2, 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cssc() {
        let refe = b"TCTCTAATCTTC";
        let read = b"TCTCTGGTCTTC";

        let corrector = GapSize::new(solid_set(&[refe], 5), 2, 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn csssc() {
        let refe = b"TCTCTAAATCTTC";
        let read = b"TCTCTGGGTCTTC";

        let corrector = GapSize::new(solid_set(&[refe], 5), 2, 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cscsc() {
        let refe = b"TCTTTACATTTTT";
        let read = b"TCTTTGCGTTTTT";

        let corrector = GapSize::new(solid_set(&[refe], 5), 2, 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cdc() {
        let refe = b"GATACATGGACACTAGTATG";
        let read = b"GATACATGGAACTAGTATG";

        let corrector = GapSize::new(solid_set(&[refe], 5), 2, 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cddc() {
        let refe = b"CAAAGCATTTTT";
        let read = b"CAAAGTTTTT";

        let corrector = GapSize::new(solid_set(&[refe], 5), 2, 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cic() {
        let refe = b"GGATAACTCT";
        let read = b"GGATATACTCT";

        let corrector = GapSize::new(solid_set(&[refe], 5), 2, 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn ciic() {
        let refe = b"GCGTAAATGGAT";
        let read = b"GCGTAATTATGGAT";

        let corrector = GapSize::new(solid_set(&[refe], 5), 2, 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }
}
