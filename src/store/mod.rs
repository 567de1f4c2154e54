//! Agenda Store
//!
//! Durable storage for agendas and the schedules they own. Every change to an
//! agenda's schedule set goes through [`AgendaStore::atomically`], so readers
//! see either the previous complete set or the next one.

pub mod memory;
pub mod persistence;
pub mod records;

pub use memory::MemoryAgendaStore;
pub use persistence::SledAgendaStore;

use crate::agenda::{Agenda, Token};
use crate::error::{ApiError, StorageError};
use crate::schedule::Schedule;
use crate::types::{CourseId, ScheduleId};

/// Writes staged inside one atomic unit.
pub trait AgendaTransaction {
    fn get_agenda(&mut self, token: &Token) -> Result<Option<Agenda>, ApiError>;
    fn put_agenda(&mut self, agenda: &Agenda) -> Result<(), ApiError>;

    /// Remove every schedule owned by `token`. Returns how many were removed.
    fn delete_schedules(&mut self, token: &Token) -> Result<usize, ApiError>;

    /// Append a schedule after the ones already staged for `token`.
    fn insert_schedule(
        &mut self,
        token: &Token,
        course_ids: &[CourseId],
    ) -> Result<ScheduleId, ApiError>;
}

/// A unit of work run by [`AgendaStore::atomically`].
///
/// May be invoked more than once if the backend retries on a write conflict,
/// so it must not have side effects outside the transaction.
pub type AtomicUnit<'u> = dyn Fn(&mut dyn AgendaTransaction) -> Result<(), ApiError> + 'u;

/// Agenda Store interface
pub trait AgendaStore: Send + Sync {
    fn get_agenda(&self, token: &Token) -> Result<Option<Agenda>, StorageError>;
    fn put_agenda(&self, agenda: &Agenda) -> Result<(), StorageError>;

    /// Delete the agenda and, by cascade, every schedule it owns.
    ///
    /// Returns false when no such agenda existed.
    fn delete_agenda(&self, token: &Token) -> Result<bool, StorageError>;

    fn list_agendas(&self) -> Result<Vec<Agenda>, StorageError>;

    /// The agenda's schedules in the order they were generated.
    fn list_schedules(&self, token: &Token) -> Result<Vec<Schedule>, StorageError>;

    fn has_schedules(&self, token: &Token) -> Result<bool, StorageError> {
        Ok(!self.list_schedules(token)?.is_empty())
    }

    /// Run `unit`; commit all of its writes if it returns `Ok`, none otherwise.
    fn atomically(&self, unit: &AtomicUnit<'_>) -> Result<(), ApiError>;

    fn require_agenda(&self, token: &Token) -> Result<Agenda, ApiError> {
        self.get_agenda(token)?
            .ok_or_else(|| ApiError::AgendaNotFound(token.clone()))
    }
}
