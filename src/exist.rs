
extern crate log;

use log::debug;

use crate::corrector::{alt_nucs, Corrector};
use crate::kmer_encoding::add_base;
use crate::kmer_set::{KmerSet, SharedKmerSet};
use crate::scenario::{Catalogue, Scenario, ScenarioOne, ScenarioTwo};

/// Corrects by exhaustively testing the fixed hypothesis catalogues: the
/// three single-error scenarios first, the thirteen double-error scenarios
/// only when no single edit explains the weak region. A hypothesis is
/// accepted when it alone reaches the full confirmation score; ties are
/// broken by demanding one further solid k-mer.
pub struct Exist {
    valid_kmer: SharedKmerSet,
    c: u8,
}

impl Exist {
    /// Creates the corrector over a shared k-mer set.
    /// # Arguments
    /// * `valid_kmer` - the solid k-mer set to validate edits against
    /// * `c` - the number of solid k-mers required to confirm an edit
    pub fn new(valid_kmer: SharedKmerSet, c: u8) -> Self {
        Self { valid_kmer, c }
    }

    fn find_scenario<S: Scenario>(&self, corr: u64, seq: &[u8]) -> Option<(Vec<u8>, usize)> {
        let set = self.valid_kmer.as_ref();

        let mut scenarii: Vec<S> = Catalogue::<S>::new(self.c as usize, set.k())
            .filter(|scenario| scenario.get_score(set, corr, seq) == self.c as usize)
            .collect();

        if scenarii.is_empty() {
            debug!("no scenario");
            None
        } else if scenarii.len() == 1 {
            debug!("one scenario {:?}", scenarii[0]);
            scenarii[0].correct(set, corr, seq)
        } else {
            debug!("multiple scenarii {:?}", scenarii);
            scenarii.retain(|scenario| scenario.one_more(set, corr, seq));

            if scenarii.len() == 1 {
                debug!("one scenario left {:?}", scenarii[0]);
                scenarii[0].correct(set, corr, seq)
            } else {
                debug!("no better scenario {:?}", scenarii);
                None
            }
        }
    }
}

impl Corrector for Exist {
    fn valid_kmer(&self) -> &dyn KmerSet {
        self.valid_kmer.as_ref()
    }

    fn correct_error(&self, kmer: u64, seq: &[u8]) -> Option<(Vec<u8>, usize)> {
        let alts = alt_nucs(self.valid_kmer(), kmer);

        if alts.len() != 1 {
            debug!("not one alternative {:?}", alts);
            return None;
        }

        let corr = add_base(kmer >> 2, alts[0], self.k());

        self.find_scenario::<ScenarioOne>(corr, seq)
            .or_else(|| self.find_scenario::<ScenarioTwo>(corr, seq))
    }
}
