
use std::marker::PhantomData;

use crate::corrector::alt_nucs;
use crate::kmer_encoding::{add_base, bits_to_nuc, nuc_to_bits};
use crate::kmer_set::KmerSet;

/// A structured hypothesis about one or two sequencing errors anchored at the
/// last symbol of the first weak k-mer. Hypotheses form a fixed, fully
/// ordered catalogue so that correction is reproducible regardless of thread
/// scheduling; `Catalogue` walks that order from either end.
///
/// Every method receives `kmer` as the anchor k-mer with its last symbol
/// already replaced by the unique solid alternative, and `seq` as the read
/// suffix starting at the anchor symbol.
pub trait Scenario: std::fmt::Debug + Copy {
    /// the number of variants in the fixed catalogue
    const COUNT: usize;

    /// Builds the variant at `index` in catalogue order, anchored with the
    /// confirmation count `c` and the k-mer length `k`.
    fn from_index(index: usize, c: usize, k: u8) -> Self;

    /// Returns the number of solid k-mers required to confirm this hypothesis.
    fn c(&self) -> usize;

    /// Returns the k-mer length this hypothesis was anchored with.
    fn k(&self) -> u8;

    /// Tests whether this hypothesis is structurally possible and, if so,
    /// returns the repaired k-mer the scan would hold afterwards and the
    /// offset into `seq` where confirmation symbols start.
    fn apply(&self, valid_kmer: &dyn KmerSet, kmer: u64, seq: &[u8]) -> Option<(u64, usize)>;

    /// Materializes the edit: the symbols to emit in place of the weak region
    /// and how many read symbols they consume. Returns nothing if the
    /// hypothesis does not hold against the set.
    fn correct(&self, valid_kmer: &dyn KmerSet, kmer: u64, seq: &[u8]) -> Option<(Vec<u8>, usize)>;

    /// Ranks the hypothesis by how many of the following `c()` k-mers become
    /// solid once the edit is applied; a full score is required to accept it.
    fn get_score(&self, valid_kmer: &dyn KmerSet, ori: u64, seq: &[u8]) -> usize {
        if let Some((mut kmer, offset)) = self.apply(valid_kmer, ori, seq) {
            if !valid_kmer.get(kmer) {
                return 0;
            }

            if offset + self.c() > seq.len() {
                return 0;
            }

            let mut score = 0;
            for &nuc in &seq[offset..offset + self.c()] {
                kmer = add_base(kmer, nuc_to_bits(nuc), valid_kmer.k());

                if valid_kmer.get(kmer) {
                    score += 1
                } else {
                    break;
                }
            }

            score
        } else {
            0
        }
    }

    /// Tie-break between hypotheses that all reach a full score: demands one
    /// further solid k-mer past the confirmation window.
    fn one_more(&self, valid_kmer: &dyn KmerSet, ori: u64, seq: &[u8]) -> bool {
        if let Some((mut kmer, offset)) = self.apply(valid_kmer, ori, seq) {
            if offset + self.c() + 1 > seq.len() {
                return false;
            }

            for &nuc in &seq[offset..offset + self.c() + 1] {
                kmer = add_base(kmer, nuc_to_bits(nuc), valid_kmer.k());
            }

            valid_kmer.get(kmer)
        } else {
            false
        }
    }
}

/// A double-ended cursor over a scenario catalogue: the index range
/// `[0, COUNT)` mapped through `Scenario::from_index`. Lazy, restartable,
/// allocation-free, with O(1) remaining-count.
pub struct Catalogue<S: Scenario> {
    front: usize,
    back: usize,
    c: usize,
    k: u8,
    _phantom: PhantomData<S>,
}

impl<S: Scenario> Catalogue<S> {
    /// Creates a cursor over the full catalogue, anchored with the
    /// confirmation count `c` and k-mer length `k`.
    pub fn new(c: usize, k: u8) -> Self {
        Self {
            front: 0,
            back: S::COUNT,
            c,
            k,
            _phantom: PhantomData,
        }
    }
}

impl<S: Scenario> Iterator for Catalogue<S> {
    type Item = S;

    fn next(&mut self) -> Option<S> {
        if self.front < self.back {
            let scenario = S::from_index(self.front, self.c, self.k);
            self.front += 1;
            Some(scenario)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<S: Scenario> DoubleEndedIterator for Catalogue<S> {
    fn next_back(&mut self) -> Option<S> {
        if self.front < self.back {
            self.back -= 1;
            Some(S::from_index(self.back, self.c, self.k))
        } else {
            None
        }
    }
}

impl<S: Scenario> ExactSizeIterator for Catalogue<S> {}

/// Single-error hypotheses: an insertion, substitution or deletion at the
/// anchor symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioOne {
    I(usize, u8),
    S(usize, u8),
    D(usize, u8),
}

impl Scenario for ScenarioOne {
    const COUNT: usize = 3;

    fn from_index(index: usize, c: usize, k: u8) -> Self {
        match index {
            0 => ScenarioOne::I(c, k),
            1 => ScenarioOne::S(c, k),
            2 => ScenarioOne::D(c, k),
            _ => unreachable!("index outside the ScenarioOne catalogue"),
        }
    }

    fn c(&self) -> usize {
        match self {
            ScenarioOne::I(c, _) => *c,
            ScenarioOne::S(c, _) => *c,
            ScenarioOne::D(c, _) => *c,
        }
    }

    fn k(&self) -> u8 {
        match self {
            ScenarioOne::I(_, k) => *k,
            ScenarioOne::S(_, k) => *k,
            ScenarioOne::D(_, k) => *k,
        }
    }

    fn apply(&self, _valid_kmer: &dyn KmerSet, kmer: u64, _seq: &[u8]) -> Option<(u64, usize)> {
        match self {
            ScenarioOne::I(_, _) => Some((kmer, 2)),
            ScenarioOne::S(_, _) => Some((kmer, 1)),
            ScenarioOne::D(_, _) => Some((kmer, 0)),
        }
    }

    fn correct(&self, _valid_kmer: &dyn KmerSet, kmer: u64, _seq: &[u8]) -> Option<(Vec<u8>, usize)> {
        match self {
            ScenarioOne::I(_, _) => Some((vec![bits_to_nuc(kmer)], 2)),
            ScenarioOne::S(_, _) => Some((vec![bits_to_nuc(kmer)], 1)),
            ScenarioOne::D(_, _) => Some((vec![bits_to_nuc(kmer)], 0)),
        }
    }
}

/// Double-error hypotheses: ordered pairs of nearby errors, either adjacent
/// (`II` .. `DD`) or separated by one confirmed solid k-mer (`ICI` .. `DCD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioTwo {
    II(usize, u8),
    IS(usize, u8),
    SS(usize, u8),
    SD(usize, u8),
    DD(usize, u8),

    ICI(usize, u8),
    ICS(usize, u8),
    ICD(usize, u8),
    SCI(usize, u8),
    SCS(usize, u8),
    SCD(usize, u8),
    DCI(usize, u8),
    DCD(usize, u8),
}

impl ScenarioTwo {
    /// how many read symbols the first edit consumes before the confirmed
    /// symbol of a compound hypothesis
    fn confirmed_at(&self) -> usize {
        match self {
            ScenarioTwo::ICI(_, _) | ScenarioTwo::ICS(_, _) | ScenarioTwo::ICD(_, _) => 2,
            ScenarioTwo::SCI(_, _) | ScenarioTwo::SCS(_, _) | ScenarioTwo::SCD(_, _) => 1,
            ScenarioTwo::DCI(_, _) | ScenarioTwo::DCD(_, _) => 0,
            _ => unreachable!("only compound hypotheses have a confirmed symbol"),
        }
    }

    /// (emitted symbol count, consumed read symbols) once the hypothesis holds
    fn edit_shape(&self) -> (usize, usize) {
        match self {
            ScenarioTwo::II(_, _) => (0, 2),
            ScenarioTwo::IS(_, _) => (1, 2),
            ScenarioTwo::SS(_, _) => (2, 2),
            ScenarioTwo::SD(_, _) => (2, 1),
            ScenarioTwo::DD(_, _) => (2, 0),
            ScenarioTwo::ICI(_, _) => (3, 5),
            ScenarioTwo::ICS(_, _) => (3, 4),
            ScenarioTwo::ICD(_, _) => (3, 3),
            ScenarioTwo::SCI(_, _) => (3, 4),
            ScenarioTwo::SCS(_, _) => (3, 3),
            ScenarioTwo::SCD(_, _) => (3, 2),
            ScenarioTwo::DCI(_, _) => (3, 3),
            ScenarioTwo::DCD(_, _) => (3, 1),
        }
    }
}

/// Resolves the second error of a pair: the window `probe` (the anchor
/// extended to the suspect symbol) must itself be weak, with exactly one
/// solid alternative at its last position.
fn second_alternative(valid_kmer: &dyn KmerSet, probe: u64) -> Option<u64> {
    if valid_kmer.get(probe) {
        //the simpler single-error hypothesis already explains the window
        return None;
    }

    let alts = alt_nucs(valid_kmer, probe);
    if alts.len() != 1 {
        return None;
    }

    Some(add_base(probe >> 2, alts[0], valid_kmer.k()))
}

impl Scenario for ScenarioTwo {
    const COUNT: usize = 13;

    fn from_index(index: usize, c: usize, k: u8) -> Self {
        match index {
            0 => ScenarioTwo::II(c, k),
            1 => ScenarioTwo::IS(c, k),
            2 => ScenarioTwo::SS(c, k),
            3 => ScenarioTwo::SD(c, k),
            4 => ScenarioTwo::DD(c, k),
            5 => ScenarioTwo::ICI(c, k),
            6 => ScenarioTwo::ICS(c, k),
            7 => ScenarioTwo::ICD(c, k),
            8 => ScenarioTwo::SCI(c, k),
            9 => ScenarioTwo::SCS(c, k),
            10 => ScenarioTwo::SCD(c, k),
            11 => ScenarioTwo::DCI(c, k),
            12 => ScenarioTwo::DCD(c, k),
            _ => unreachable!("index outside the ScenarioTwo catalogue"),
        }
    }

    fn c(&self) -> usize {
        match self {
            ScenarioTwo::II(c, _)
            | ScenarioTwo::IS(c, _)
            | ScenarioTwo::SS(c, _)
            | ScenarioTwo::SD(c, _)
            | ScenarioTwo::DD(c, _)
            | ScenarioTwo::ICI(c, _)
            | ScenarioTwo::ICS(c, _)
            | ScenarioTwo::ICD(c, _)
            | ScenarioTwo::SCI(c, _)
            | ScenarioTwo::SCS(c, _)
            | ScenarioTwo::SCD(c, _)
            | ScenarioTwo::DCI(c, _)
            | ScenarioTwo::DCD(c, _) => *c,
        }
    }

    fn k(&self) -> u8 {
        match self {
            ScenarioTwo::II(_, k)
            | ScenarioTwo::IS(_, k)
            | ScenarioTwo::SS(_, k)
            | ScenarioTwo::SD(_, k)
            | ScenarioTwo::DD(_, k)
            | ScenarioTwo::ICI(_, k)
            | ScenarioTwo::ICS(_, k)
            | ScenarioTwo::ICD(_, k)
            | ScenarioTwo::SCI(_, k)
            | ScenarioTwo::SCS(_, k)
            | ScenarioTwo::SCD(_, k)
            | ScenarioTwo::DCI(_, k)
            | ScenarioTwo::DCD(_, k) => *k,
        }
    }

    fn apply(&self, valid_kmer: &dyn KmerSet, kmer: u64, seq: &[u8]) -> Option<(u64, usize)> {
        let k = self.k();

        match self {
            //two spurious symbols, the anchor alternative resurfaces two symbols later
            ScenarioTwo::II(_, _) => Some((kmer, 3)),

            //a spurious symbol followed by a substituted one
            ScenarioTwo::IS(_, _) => {
                if seq.len() < 2 {
                    return None;
                }
                second_alternative(valid_kmer, add_base(kmer >> 2, nuc_to_bits(seq[1]), k))
                    .map(|fixed| (fixed, 3))
            }

            //two adjacent substitutions
            ScenarioTwo::SS(_, _) => {
                if seq.len() < 2 {
                    return None;
                }
                second_alternative(valid_kmer, add_base(kmer, nuc_to_bits(seq[1]), k))
                    .map(|fixed| (fixed, 2))
            }

            //a substitution with a missing symbol right after it
            ScenarioTwo::SD(_, _) => {
                if seq.len() < 2 {
                    return None;
                }
                second_alternative(valid_kmer, add_base(kmer, nuc_to_bits(seq[1]), k))
                    .map(|fixed| (fixed, 1))
            }

            //two missing symbols before the anchor
            ScenarioTwo::DD(_, _) => {
                if seq.is_empty() {
                    return None;
                }
                second_alternative(valid_kmer, add_base(kmer, nuc_to_bits(seq[0]), k))
                    .map(|fixed| (fixed, 0))
            }

            //first edit, one confirmed solid k-mer, then the second edit
            ScenarioTwo::ICI(_, _)
            | ScenarioTwo::ICS(_, _)
            | ScenarioTwo::ICD(_, _)
            | ScenarioTwo::SCI(_, _)
            | ScenarioTwo::SCS(_, _)
            | ScenarioTwo::SCD(_, _)
            | ScenarioTwo::DCI(_, _)
            | ScenarioTwo::DCD(_, _) => {
                let confirmed = self.confirmed_at();
                if seq.len() < confirmed + 2 {
                    return None;
                }

                let solid_step = add_base(kmer, nuc_to_bits(seq[confirmed]), k);
                if !valid_kmer.get(solid_step) {
                    return None;
                }

                let probe = add_base(solid_step, nuc_to_bits(seq[confirmed + 1]), k);
                let (_, offset) = self.edit_shape();
                second_alternative(valid_kmer, probe).map(|fixed| (fixed, offset))
            }
        }
    }

    fn correct(&self, valid_kmer: &dyn KmerSet, kmer: u64, seq: &[u8]) -> Option<(Vec<u8>, usize)> {
        let (fixed, _) = self.apply(valid_kmer, kmer, seq)?;
        let (emitted, consumed) = self.edit_shape();

        let mut local_correct: Vec<u8> = Vec::with_capacity(emitted);
        for shift in (0..emitted).rev() {
            local_correct.push(bits_to_nuc(fixed >> (2 * shift as u64)));
        }

        Some((local_correct, consumed))
    }
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

    fn names<S: Scenario>(scenarii: &[S]) -> Vec<String> {
        scenarii
            .iter()
            .map(|s| format!("{:?}", s))
            .collect::<Vec<String>>()
    }

    #[test]
    fn test_exhaustive_forward() {
        let ones: Vec<ScenarioOne> = Catalogue::new(2, 5).collect();
        let twos: Vec<ScenarioTwo> = Catalogue::new(2, 5).collect();

        assert_eq!(ones.len(), 3);
        assert_eq!(twos.len(), 13);

        //3 + 13 = 16 distinct variants, no duplicates and no omissions
        let mut all = names(&ones);
        all.extend(names(&twos));
        let distinct: std::collections::HashSet<String> = all.iter().cloned().collect();
        assert_eq!(distinct.len(), 16);
    }

    #[test]
    fn test_backward_is_reverse() {
        let forward: Vec<ScenarioTwo> = Catalogue::new(2, 5).collect();
        let mut backward: Vec<ScenarioTwo> = Catalogue::new(2, 5).rev().collect();

        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_meet_in_the_middle() {
        let mut catalogue: Catalogue<ScenarioTwo> = Catalogue::new(2, 5);
        let mut seen: Vec<ScenarioTwo> = Vec::new();

        loop {
            match catalogue.next() {
                Some(scenario) => seen.push(scenario),
                None => break,
            }
            if let Some(scenario) = catalogue.next_back() {
                seen.push(scenario);
            }
        }

        assert_eq!(seen.len(), 13);
        let distinct: std::collections::HashSet<String> = names(&seen).iter().cloned().collect();
        assert_eq!(distinct.len(), 13);
    }

    #[test]
    fn test_remaining_count() {
        let mut catalogue: Catalogue<ScenarioOne> = Catalogue::new(2, 5);
        assert_eq!(catalogue.len(), 3);

        catalogue.next();
        assert_eq!(catalogue.len(), 2);
        catalogue.next_back();
        assert_eq!(catalogue.len(), 1);
        catalogue.next();
        assert_eq!(catalogue.len(), 0);
        assert!(catalogue.next().is_none());

        //a fresh cursor restarts from the full catalogue
        let restarted: Catalogue<ScenarioOne> = Catalogue::new(2, 5);
        assert_eq!(restarted.len(), 3);
    }

    #[test]
    fn test_substitution_scores_full() {
        //ACTGACGAC with a substitution read ACTGATGAC: anchor CTGAT, alternative C
        let set = solid_set(&[b"ACTGACGAC"], 5);
        let corr = encode(b"CTGAC").unwrap();
        let seq = b"TGAC";

        let sub = ScenarioOne::S(2, 5);
        let ins = ScenarioOne::I(2, 5);
        let del = ScenarioOne::D(2, 5);

        assert_eq!(sub.get_score(set.as_ref(), corr, seq), 2);
        assert_eq!(ins.get_score(set.as_ref(), corr, seq), 0);
        assert_eq!(del.get_score(set.as_ref(), corr, seq), 0);

        let (emitted, consumed) = sub.correct(set.as_ref(), corr, seq).unwrap();
        assert_eq!(emitted, b"C".to_vec());
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_adjacent_substitutions_score_full() {
        //ACTGACGAG read as ACTGATAAG: two adjacent substitutions at the anchor
        let set = solid_set(&[b"ACTGACGAG"], 5);
        let corr = encode(b"CTGAC").unwrap();
        let seq = b"TAAG";

        let double = ScenarioTwo::SS(2, 5);
        assert_eq!(double.get_score(set.as_ref(), corr, seq), 2);

        let (emitted, consumed) = double.correct(set.as_ref(), corr, seq).unwrap();
        assert_eq!(emitted, b"CG".to_vec());
        assert_eq!(consumed, 2);

        //the single-error hypotheses all fail on the same window
        for scenario in Catalogue::<ScenarioOne>::new(2, 5) {
            assert_eq!(scenario.get_score(set.as_ref(), corr, seq), 0);
        }
    }
}
