//! Course partitioning: splits the candidate set into mandatory, remainder and
//! blocked courses before enumeration.

use crate::course::Course;
use crate::error::ApiError;
use crate::leave::Leave;
use crate::types::CourseId;
use std::collections::BTreeSet;

/// Three disjoint course sets plus the mandatory courses a leave blocks.
///
/// Every set keeps the order of the input course slice.
#[derive(Debug, Clone, Default)]
pub struct CoursePartition {
    mandatory: Vec<Course>,
    remainder: Vec<Course>,
    blocked: Vec<Course>,
    /// Parallel to `blocked`: whether each blocked course is mandatory.
    blocked_is_mandatory: Vec<bool>,
    blocked_mandatory: Vec<CourseId>,
}

impl CoursePartition {
    pub fn new(courses: &[Course], mandatory_ids: &BTreeSet<CourseId>, leaves: &[Leave]) -> Self {
        let mut partition = CoursePartition::default();
        for course in courses {
            let is_mandatory = mandatory_ids.contains(&course.id);
            if course.overlaps_any_leave(leaves) {
                if is_mandatory {
                    partition.blocked_mandatory.push(course.id);
                }
                partition.blocked.push(course.clone());
                partition.blocked_is_mandatory.push(is_mandatory);
            } else if is_mandatory {
                partition.mandatory.push(course.clone());
            } else {
                partition.remainder.push(course.clone());
            }
        }
        partition
    }

    /// Non-blocked mandatory courses.
    pub fn mandatory(&self) -> &[Course] {
        &self.mandatory
    }

    /// Non-blocked, non-mandatory courses eligible for combination.
    pub fn remainder(&self) -> &[Course] {
        &self.remainder
    }

    /// Courses with at least one slot overlapping a leave.
    pub fn blocked(&self) -> &[Course] {
        &self.blocked
    }

    /// Blocked courses that are also mandatory.
    pub fn blocked_mandatory(&self) -> impl Iterator<Item = &Course> {
        self.blocked_where(true)
    }

    /// Blocked courses that are not mandatory.
    pub fn blocked_remainder(&self) -> impl Iterator<Item = &Course> {
        self.blocked_where(false)
    }

    fn blocked_where(&self, mandatory: bool) -> impl Iterator<Item = &Course> {
        self.blocked
            .iter()
            .zip(&self.blocked_is_mandatory)
            .filter(move |(_, is_mandatory)| **is_mandatory == mandatory)
            .map(|(course, _)| course)
    }

    /// Every course that survived leave pruning, mandatory or not.
    pub fn pruned(&self) -> impl Iterator<Item = &Course> {
        self.mandatory.iter().chain(self.remainder.iter())
    }

    /// Ids of mandatory courses blocked by a leave.
    pub fn conflicts(&self) -> &[CourseId] {
        &self.blocked_mandatory
    }

    pub fn has_conflicts(&self) -> bool {
        !self.blocked_mandatory.is_empty()
    }

    /// The enumerator inputs `(mandatory, remainder)`, or the mandatory/blocked
    /// conflict that makes the run invalid.
    pub fn into_candidates(self) -> Result<(Vec<Course>, Vec<Course>), ApiError> {
        if self.has_conflicts() {
            return Err(ApiError::MandatoryBlocked(self.blocked_mandatory));
        }
        Ok((self.mandatory, self.remainder))
    }
}
