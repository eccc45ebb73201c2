
extern crate log;

use log::debug;

use crate::corrector::{alt_nucs, error_len, next_nucs, Corrector};
use crate::kmer_encoding::{add_base, bits_to_nuc};
use crate::kmer_set::{KmerSet, SharedKmerSet};

/// hard cap on explored branches so a repeat-rich neighborhood cannot blow up
const BRANCH_LIMIT: usize = 256;

/// Corrects by walking the local de-Bruijn neighborhood of the weak region:
/// starting from every solid alternative of the failing k-mer, branch over
/// all solid successors and search for a path that reconnects to the first
/// solid k-mer downstream. The walk is bounded by `max_search` extra symbols
/// and a branch budget; exactly one reconnecting path is required.
pub struct Graph {
    valid_kmer: SharedKmerSet,
    max_search: u8,
}

impl Graph {
    /// Creates the corrector over a shared k-mer set.
    /// # Arguments
    /// * `valid_kmer` - the solid k-mer set to validate edits against
    /// * `max_search` - how many symbols past the weak region a path may grow
    pub fn new(valid_kmer: SharedKmerSet, max_search: u8) -> Self {
        Self {
            valid_kmer,
            max_search,
        }
    }
}

impl Corrector for Graph {
    fn valid_kmer(&self) -> &dyn KmerSet {
        self.valid_kmer.as_ref()
    }

    fn correct_error(&self, kmer: u64, seq: &[u8]) -> Option<(Vec<u8>, usize)> {
        let set = self.valid_kmer.as_ref();

        let (gap_len, first_solid) = error_len(seq, kmer, set);
        if !set.get(first_solid) {
            debug!("no solid anchor downstream of the weak region");
            return None;
        }

        let max_depth = gap_len + 1 + self.max_search as usize;
        let mut completed: Vec<Vec<u8>> = Vec::new();
        let mut stack: Vec<(u64, Vec<u8>)> = alt_nucs(set, kmer)
            .iter()
            .map(|&alt| (add_base(kmer >> 2, alt, self.k()), vec![bits_to_nuc(alt)]))
            .collect();

        let mut explored: usize = 0;
        while let Some((current, path)) = stack.pop() {
            explored += 1;
            if explored > BRANCH_LIMIT {
                debug!("branch budget exhausted");
                return None;
            }

            if current == first_solid {
                completed.push(path);
                continue;
            }

            if path.len() >= max_depth {
                continue;
            }

            for next in next_nucs(set, current) {
                let mut extended = path.clone();
                extended.push(bits_to_nuc(next));
                stack.push((add_base(current, next, self.k()), extended));
            }
        }

        if completed.len() == 1 {
            completed.pop().map(|path| (path, gap_len + 1))
        } else {
            debug!("{} reconnecting paths, nothing unambiguous", completed.len());
            None
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use std::sync::Arc;

    use crate::kmer_set::{HashKmerSet, SharedKmerSet};

    fn solid_set(sequences: &[&[u8]], k: u8) -> SharedKmerSet {
        let mut solid = HashKmerSet::new(k).unwrap();
        for seq in sequences {
            solid.insert_sequence(seq);
        }
        Arc::new(solid)
    }

    #[test]
    fn csc() {
        let refe = b"TCTTTATTTTC";
        let read = b"TCTTTGTTTTC";

        let corrector = Graph::new(solid_set(&[refe], 5), 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cssc() {
        let refe = b"TCTCTAATCTTC";
        let read = b"TCTCTGGTCTTC";

        let corrector = Graph::new(solid_set(&[refe], 5), 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cdc() {
        let refe = b"GATACATGGACACTAGTATG";
        let read = b"GATACATGGAACTAGTATG";

        let corrector = Graph::new(solid_set(&[refe], 5), 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cddc() {
        let refe = b"CAAAGCATTTTT";
        let read = b"CAAAGTTTTT";

        let corrector = Graph::new(solid_set(&[refe], 5), 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn cic() {
        let refe = b"GATACATGGACACTAGTATG";
        let read = b"GATACATGGATCACTAGTATG";

        let corrector = Graph::new(solid_set(&[refe], 5), 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn ciic() {
        let refe = b"GATACATGGACACTAGTATG";
        let read = b"GATACATGGATTCACTAGTATG";

        let corrector = Graph::new(solid_set(&[refe], 5), 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn branching_dead_end_still_unique() {
        //the extra k-mer opens a branch that dead-ends, the true path is
        //still the only one that reconnects
        let refe = b"GATACATGGACACTAGTATG";
        let read = b"GATACATGGAACTAGTATG";

        let corrector = Graph::new(solid_set(&[refe, b"GGACT"], 5), 5);

        assert_eq!(refe, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }

    #[test]
    fn branching_repeat_is_ambiguous() {
        //the TTTTT self-loop reconnects through runs of several lengths, so
        //no unique path exists and the read passes through unchanged
        let refe = b"TCTTTATTTTC";
        let read = b"TCTTTGTTTTC";

        let corrector = Graph::new(solid_set(&[refe, b"TTTTTT"], 5), 5);

        assert_eq!(read, corrector.correct(read).as_slice());
        assert_eq!(refe, corrector.correct(refe).as_slice());
    }
}
