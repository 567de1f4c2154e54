//! Agenda: the scheduling request and aggregate root.
//!
//! An agenda owns its candidate courses, constraints and the processing state
//! that gates schedule generation. Generated schedules live in the store and
//! are owned by the agenda's token.

pub mod token;
pub mod validation;

pub use token::Token;
pub use validation::{validate, ValidationResult, Violation};

use crate::leave::Leave;
use crate::types::{CourseId, TermId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::ops::RangeInclusive;

/// Allowed values of `courses_per_schedule`.
pub const COURSES_PER_SCHEDULE_RANGE: RangeInclusive<u32> = 1..=5;

/// Processing state derived from the agenda's `processing` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgendaState {
    Idle,
    Processing,
}

/// Scheduling request for one academic degree term.
#[derive(Debug, Clone, PartialEq)]
pub struct Agenda {
    pub token: Token,
    pub term: TermId,
    course_ids: Vec<CourseId>,
    mandatory_course_ids: BTreeSet<CourseId>,
    pub leaves: Vec<Leave>,
    pub courses_per_schedule: u32,
    processing: bool,
    combined_at: Option<DateTime<Utc>>,
}

impl Agenda {
    /// Fresh idle agenda with a new token and no courses or leaves.
    pub fn new(term: impl Into<TermId>) -> Self {
        Self {
            token: Token::generate(),
            term: term.into(),
            course_ids: Vec::new(),
            mandatory_course_ids: BTreeSet::new(),
            leaves: Vec::new(),
            courses_per_schedule: 1,
            processing: false,
            combined_at: None,
        }
    }

    /// Rebuild an agenda from stored attributes. Used by the store codecs.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        token: Token,
        term: TermId,
        course_ids: Vec<CourseId>,
        mandatory_course_ids: BTreeSet<CourseId>,
        leaves: Vec<Leave>,
        courses_per_schedule: u32,
        processing: bool,
        combined_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            token,
            term,
            course_ids,
            mandatory_course_ids,
            leaves,
            courses_per_schedule,
            processing,
            combined_at,
        }
    }

    pub fn course_ids(&self) -> &[CourseId] {
        &self.course_ids
    }

    /// Replace the candidate courses. Keeps caller order, drops repeats.
    pub fn set_course_ids(&mut self, ids: impl IntoIterator<Item = CourseId>) {
        let mut seen = HashSet::new();
        self.course_ids = ids.into_iter().filter(|id| seen.insert(*id)).collect();
    }

    pub fn mandatory_course_ids(&self) -> &BTreeSet<CourseId> {
        &self.mandatory_course_ids
    }

    pub fn set_mandatory_ids(&mut self, ids: impl IntoIterator<Item = CourseId>) {
        self.mandatory_course_ids = ids.into_iter().collect();
    }

    /// Replace the mandatory ids from raw form input.
    ///
    /// Blank and unparsable entries are discarded; the rest are coerced to ids.
    pub fn set_mandatory_course_ids<I, S>(&mut self, raw: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.mandatory_course_ids = normalize_course_ids(raw);
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn combined_at(&self) -> Option<DateTime<Utc>> {
        self.combined_at
    }

    pub fn state(&self) -> AgendaState {
        if self.processing {
            AgendaState::Processing
        } else {
            AgendaState::Idle
        }
    }

    /// Enter processing: a regeneration has been requested and has not finished.
    pub fn begin_processing(&mut self) {
        self.processing = true;
        self.combined_at = None;
    }

    /// Leave processing, stamping the completion time.
    pub fn mark_as_finished_processing(&mut self, now: DateTime<Utc>) {
        self.processing = false;
        self.combined_at = Some(now);
    }

    pub fn validate(&self) -> ValidationResult {
        validation::validate(self)
    }

    /// Mandatory ids that are also candidates.
    pub fn effective_mandatory_ids(&self) -> BTreeSet<CourseId> {
        self.mandatory_course_ids
            .iter()
            .copied()
            .filter(|id| self.course_ids.contains(id))
            .collect()
    }
}

/// Parse raw id strings, dropping blanks, junk and duplicates.
pub fn normalize_course_ids<I, S>(raw: I) -> BTreeSet<CourseId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|entry| entry.as_ref().trim().parse::<CourseId>().ok())
        .collect()
}
