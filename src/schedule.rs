//! Persisted schedules: one valid course combination owned by an agenda.

use crate::agenda::Token;
use crate::types::{CourseId, ScheduleId};
use serde::{Deserialize, Serialize};

/// A generated combination as stored. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub agenda: Token,
    /// Position in the enumeration order of the run that produced it.
    pub position: u64,
    pub course_ids: Vec<CourseId>,
}

impl Schedule {
    pub fn contains(&self, course_id: CourseId) -> bool {
        self.course_ids.contains(&course_id)
    }
}
