
extern crate log;

use log::debug;

use crate::corrector::{alt_nucs, Corrector};
use crate::kmer_encoding::bits_to_nuc;
use crate::kmer_set::{KmerSet, SharedKmerSet};

/// The cheapest strategy: at a weak k-mer, try each alternative symbol at the
/// error position in fixed A<C<G<T priority and take the first one that makes
/// the k-mer solid. No lookahead, no confirmation.
pub struct Greedy {
    valid_kmer: SharedKmerSet,
}

impl Greedy {
    /// Creates the corrector over a shared k-mer set.
    /// # Arguments
    /// * `valid_kmer` - the solid k-mer set to validate edits against
    pub fn new(valid_kmer: SharedKmerSet) -> Self {
        Self { valid_kmer }
    }
}

impl Corrector for Greedy {
    fn valid_kmer(&self) -> &dyn KmerSet {
        self.valid_kmer.as_ref()
    }

    fn correct_error(&self, kmer: u64, _seq: &[u8]) -> Option<(Vec<u8>, usize)> {
        let alts = alt_nucs(self.valid_kmer(), kmer);

        if alts.is_empty() {
            debug!("no alternative");
            return None;
        }

        Some((vec![bits_to_nuc(alts[0])], 1))
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
        let refe = b"ACTGACGAC";
        let read = b"ACTGATGAC";

        let corrector = Greedy::new(solid_set(&[refe], 5));

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cscsc() {
        let refe = b"TCTTTACATTTTT";
        let read = b"TCTTTGCGTTTTT";

        let corrector = Greedy::new(solid_set(&[refe], 5));

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn takes_first_alternative_in_priority_order() {
        //both ACTGA and ACTGT are solid continuations, A wins the tie
        let set = solid_set(&[b"TACTGAC", b"TACTGTC"], 5);
        let corrector = Greedy::new(set);

        let read = b"TACTGCC";
        assert_eq!(b"TACTGAC", corrector.correct(read).as_slice());
    }

    #[test]
    fn no_alternative_leaves_read_alone() {
        //the set knows a single k-mer, so the weak window has no solid
        //alternative at the error position
        let corrector = Greedy::new(solid_set(&[b"ACTGA"], 5));

        let read = b"ACTGAT";
        assert_eq!(read, corrector.correct(read).as_slice());
    }
}
