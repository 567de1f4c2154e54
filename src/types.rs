//! Shared identifier types.

/// Catalog identifier of a course.
pub type CourseId = u64;

/// Store-generated identifier of a persisted schedule.
pub type ScheduleId = u64;

/// Opaque name of an academic degree term (the catalog key).
pub type TermId = String;

/// Minutes since Monday 00:00 of the teaching week.
pub type Minute = u32;
