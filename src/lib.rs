//! Timetabler: course schedule generation
//!
//! Given an agenda (candidate courses, mandatory courses, blocked leaves and a
//! schedule size) the engine enumerates every conflict-free combination of
//! courses and replaces the agenda's stored schedules with them atomically.

pub mod access;
pub mod agenda;
pub mod catalog;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod course;
pub mod dispatch;
pub mod enumerator;
pub mod error;
pub mod init;
pub mod interval;
pub mod leave;
pub mod logging;
pub mod orchestrator;
pub mod partition;
pub mod schedule;
pub mod store;
pub mod types;

pub use agenda::{Agenda, AgendaState, Token};
pub use course::Course;
pub use enumerator::{generate, generate_parallel, Combination};
pub use error::{ApiError, StorageError};
pub use interval::{overlaps, Interval};
pub use leave::Leave;
pub use orchestrator::{CombineService, RegenerationSummary, Regenerator};
pub use partition::CoursePartition;
pub use schedule::Schedule;
