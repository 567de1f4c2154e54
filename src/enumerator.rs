//! Schedule enumeration.
//!
//! Produces every conflict-free combination of `target` courses that contains
//! all mandatory courses. The remainder pool is walked depth first in ascending
//! course id order and a branch is abandoned as soon as the partially built
//! combination contains a conflict, so doomed subsets are never materialized.
//!
//! Output order is the lexicographic order of the chosen remainder subsets and
//! is stable across runs and across `generate` / `generate_parallel`.

use crate::course::{pairwise_compatible, Course};
use crate::leave::Leave;
use rayon::prelude::*;

/// One valid combination, sorted by course id.
pub type Combination<'a> = Vec<&'a Course>;

/// Enumerate every valid combination of `target` courses.
///
/// Returns an empty result when the mandatory courses alone exceed `target`,
/// conflict with each other, or overlap a leave.
pub fn generate<'a>(
    mandatory: &'a [Course],
    remainder: &'a [Course],
    leaves: &[Leave],
    target: usize,
) -> Vec<Combination<'a>> {
    match Search::prepare(mandatory, remainder, leaves, target) {
        Prepared::Done(result) => result,
        Prepared::Search(search) => {
            let mut out = Vec::new();
            let mut chosen = Vec::with_capacity(search.need);
            search.extend(0, &mut chosen, &mut out);
            out
        }
    }
}

/// Same output as [`generate`], sharded by first chosen remainder course across
/// the rayon pool once the remainder pool reaches `threshold` courses.
pub fn generate_parallel<'a>(
    mandatory: &'a [Course],
    remainder: &'a [Course],
    leaves: &[Leave],
    target: usize,
    threshold: usize,
) -> Vec<Combination<'a>> {
    if remainder.len() < threshold {
        return generate(mandatory, remainder, leaves, target);
    }
    match Search::prepare(mandatory, remainder, leaves, target) {
        Prepared::Done(result) => result,
        Prepared::Search(search) => {
            let last_first = search.pool.len() + 1 - search.need;
            let shards: Vec<Vec<Combination<'a>>> = (0..last_first)
                .into_par_iter()
                .map(|first| {
                    let mut out = Vec::new();
                    if search.eligible[first] {
                        let mut chosen = Vec::with_capacity(search.need);
                        chosen.push(first);
                        search.extend(first + 1, &mut chosen, &mut out);
                    }
                    out
                })
                .collect();
            shards.into_iter().flatten().collect()
        }
    }
}

/// `C(n, k)`, saturating at `u64::MAX`. Worst-case size of a run.
pub fn count_candidates(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k) as u128;
    let n = n as u128;
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * (n - i) / (i + 1);
        if acc > u64::MAX as u128 {
            return u64::MAX;
        }
    }
    acc as u64
}

enum Prepared<'a> {
    Done(Vec<Combination<'a>>),
    Search(Search<'a>),
}

struct Search<'a> {
    mandatory: Vec<&'a Course>,
    /// Remainder sorted by id.
    pool: Vec<&'a Course>,
    /// Pool course clears every leave and every mandatory course.
    eligible: Vec<bool>,
    /// `compatible[i][j]`: pool courses i and j share no slot.
    compatible: Vec<Vec<bool>>,
    need: usize,
}

impl<'a> Search<'a> {
    fn prepare(
        mandatory: &'a [Course],
        remainder: &'a [Course],
        leaves: &[Leave],
        target: usize,
    ) -> Prepared<'a> {
        if mandatory.len() > target {
            return Prepared::Done(Vec::new());
        }
        if mandatory.iter().any(|c| c.overlaps_any_leave(leaves)) || !pairwise_compatible(mandatory)
        {
            return Prepared::Done(Vec::new());
        }

        let mut sorted_mandatory: Vec<&Course> = mandatory.iter().collect();
        sorted_mandatory.sort_by_key(|c| c.id);

        let need = target - mandatory.len();
        if need == 0 {
            return Prepared::Done(vec![sorted_mandatory]);
        }
        if remainder.len() < need {
            return Prepared::Done(Vec::new());
        }

        let mut pool: Vec<&Course> = remainder.iter().collect();
        pool.sort_by_key(|c| c.id);

        let eligible = pool
            .iter()
            .map(|c| {
                !c.overlaps_any_leave(leaves) && !sorted_mandatory.iter().any(|m| m.conflicts_with(c))
            })
            .collect();
        let compatible = pool
            .iter()
            .map(|a| pool.iter().map(|b| !a.conflicts_with(b)).collect())
            .collect();

        Prepared::Search(Search {
            mandatory: sorted_mandatory,
            pool,
            eligible,
            compatible,
            need,
        })
    }

    /// Extend `chosen` (pool indexes, ascending) with indexes from `start` on.
    fn extend(&self, start: usize, chosen: &mut Vec<usize>, out: &mut Vec<Combination<'a>>) {
        if chosen.len() == self.need {
            out.push(self.materialize(chosen));
            return;
        }
        let missing = self.need - chosen.len();
        // stop once too few pool courses remain to fill the combination
        let last = self.pool.len() - missing;
        for i in start..=last {
            if !self.eligible[i] || !chosen.iter().all(|&j| self.compatible[i][j]) {
                continue;
            }
            chosen.push(i);
            self.extend(i + 1, chosen, out);
            chosen.pop();
        }
    }

    fn materialize(&self, chosen: &[usize]) -> Combination<'a> {
        let mut combination: Combination<'a> = self.mandatory.clone();
        combination.extend(chosen.iter().map(|&i| self.pool[i]));
        combination.sort_by_key(|c| c.id);
        combination
    }
}
