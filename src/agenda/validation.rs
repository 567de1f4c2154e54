//! Agenda validation.
//!
//! Pure checks returning every violation found, run once when a combine is
//! requested and before any state transition.

use crate::agenda::{Agenda, COURSES_PER_SCHEDULE_RANGE};
use crate::leave::invalid_leaves;
use crate::types::CourseId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Validation result.
pub type ValidationResult = Result<(), Vec<Violation>>;

/// Agenda attribute a violation is reported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Courses,
    CoursesPerSchedule,
    Leaves,
    MandatoryCourseIds,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Courses => "courses",
            Field::CoursesPerSchedule => "courses_per_schedule",
            Field::Leaves => "leaves",
            Field::MandatoryCourseIds => "mandatory_course_ids",
        }
    }
}

/// Categories of violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ViolationKind {
    /// Required collection is empty.
    Blank,
    /// Number outside its allowed range.
    OutOfRange,
    /// Leaves at these indexes are malformed or overlap another leave.
    InvalidLeaves { indexes: Vec<usize> },
    /// Mandatory ids missing from the candidate course ids.
    NotSubset { ids: Vec<CourseId> },
    /// Candidate course ids the term catalog does not offer.
    UnknownCourses { ids: Vec<CourseId> },
    /// More candidate courses than the enumerator is allowed to search.
    TooMany { limit: usize },
}

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: Field,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(field: Field, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field.as_str(), self.message)
    }
}

/// Validates the agenda's own attributes.
///
/// Checks:
/// 1. At least one candidate course
/// 2. `courses_per_schedule` within 1..=5
/// 3. Every leave well formed and no two leaves overlapping
/// 4. Mandatory ids a subset of the candidate ids
pub fn validate(agenda: &Agenda) -> ValidationResult {
    let mut violations = Vec::new();

    if agenda.course_ids().is_empty() {
        violations.push(Violation::new(
            Field::Courses,
            ViolationKind::Blank,
            "can't be blank",
        ));
    }

    if !COURSES_PER_SCHEDULE_RANGE.contains(&agenda.courses_per_schedule) {
        violations.push(Violation::new(
            Field::CoursesPerSchedule,
            ViolationKind::OutOfRange,
            format!(
                "must be in {}..={} (got {})",
                COURSES_PER_SCHEDULE_RANGE.start(),
                COURSES_PER_SCHEDULE_RANGE.end(),
                agenda.courses_per_schedule
            ),
        ));
    }

    let bad_leaves = invalid_leaves(&agenda.leaves);
    if !bad_leaves.is_empty() {
        violations.push(Violation::new(
            Field::Leaves,
            ViolationKind::InvalidLeaves {
                indexes: bad_leaves.clone(),
            },
            format!("are invalid at positions {:?}", bad_leaves),
        ));
    }

    let candidates: HashSet<CourseId> = agenda.course_ids().iter().copied().collect();
    let missing: Vec<CourseId> = agenda
        .mandatory_course_ids()
        .iter()
        .copied()
        .filter(|id| !candidates.contains(id))
        .collect();
    if !missing.is_empty() {
        violations.push(Violation::new(
            Field::MandatoryCourseIds,
            ViolationKind::NotSubset { ids: missing.clone() },
            format!("are not among the agenda courses: {:?}", missing),
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Checks the candidate courses against the term catalog and the configured
/// search bound.
pub fn validate_against_catalog(
    agenda: &Agenda,
    catalog_ids: &HashSet<CourseId>,
    max_candidate_courses: usize,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    let unknown: Vec<CourseId> = agenda
        .course_ids()
        .iter()
        .copied()
        .filter(|id| !catalog_ids.contains(id))
        .collect();
    if !unknown.is_empty() {
        violations.push(Violation::new(
            Field::Courses,
            ViolationKind::UnknownCourses { ids: unknown.clone() },
            format!("are not offered in term {}: {:?}", agenda.term, unknown),
        ));
    }

    if agenda.course_ids().len() > max_candidate_courses {
        violations.push(Violation::new(
            Field::Courses,
            ViolationKind::TooMany {
                limit: max_candidate_courses,
            },
            format!(
                "exceed the limit of {} candidate courses (got {})",
                max_candidate_courses,
                agenda.course_ids().len()
            ),
        ));
    }

    violations
}
