//! Catalog courses and their time slots.

use crate::interval::{any_overlap, Interval};
use crate::leave::Leave;
use crate::types::CourseId;
use serde::{Deserialize, Serialize};

/// A catalog course: identity plus its weekly time slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    #[serde(default)]
    pub slots: Vec<Interval>,
}

impl Course {
    pub fn new(id: CourseId, slots: Vec<Interval>) -> Self {
        Self { id, slots }
    }

    /// Whether any slot of `self` overlaps any slot of `other`.
    pub fn conflicts_with(&self, other: &Course) -> bool {
        any_overlap(&self.slots, &other.slots)
    }

    /// Whether any slot overlaps any of `leaves`.
    pub fn overlaps_any_leave(&self, leaves: &[Leave]) -> bool {
        self.slots
            .iter()
            .any(|slot| leaves.iter().any(|leave| slot.overlaps(&leave.interval())))
    }
}

/// Whether no two courses in `courses` conflict.
pub fn pairwise_compatible<'a, I>(courses: I) -> bool
where
    I: IntoIterator<Item = &'a Course>,
{
    let courses: Vec<&Course> = courses.into_iter().collect();
    for (i, a) in courses.iter().enumerate() {
        for b in &courses[i + 1..] {
            if a.conflicts_with(b) {
                return false;
            }
        }
    }
    true
}
