//! Leaves: blocked intervals no selected course may overlap.

use crate::interval::Interval;
use crate::types::Minute;
use serde::{Deserialize, Serialize};

/// One blocked interval `[starts_at, ends_at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leave {
    pub starts_at: Minute,
    pub ends_at: Minute,
}

impl Leave {
    pub fn new(starts_at: Minute, ends_at: Minute) -> Self {
        Self { starts_at, ends_at }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.starts_at, self.ends_at)
    }

    pub fn overlaps(&self, other: &Leave) -> bool {
        self.interval().overlaps(&other.interval())
    }
}

/// Indexes of every invalid leave in `leaves`, ascending.
///
/// A leave is invalid when `starts_at >= ends_at` or when it overlaps another
/// leave; an overlap invalidates both members of the pair.
pub fn invalid_leaves(leaves: &[Leave]) -> Vec<usize> {
    let mut invalid = vec![false; leaves.len()];
    for (i, leave) in leaves.iter().enumerate() {
        if !leave.interval().is_well_formed() {
            invalid[i] = true;
        }
    }
    for i in 0..leaves.len() {
        for j in (i + 1)..leaves.len() {
            if leaves[i].overlaps(&leaves[j]) {
                invalid[i] = true;
                invalid[j] = true;
            }
        }
    }
    invalid
        .into_iter()
        .enumerate()
        .filter_map(|(i, bad)| bad.then_some(i))
        .collect()
}
