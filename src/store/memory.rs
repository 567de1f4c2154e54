//! In-memory agenda store for tests and single-process use.

use crate::agenda::{Agenda, Token};
use crate::error::{ApiError, StorageError};
use crate::schedule::Schedule;
use crate::store::{AgendaStore, AgendaTransaction, AtomicUnit};
use crate::types::{CourseId, ScheduleId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    agendas: BTreeMap<Token, Agenda>,
    schedules: HashMap<Token, Vec<Schedule>>,
    next_schedule_id: ScheduleId,
}

/// Agenda store backed by maps behind a lock.
///
/// `atomically` works on a snapshot and swaps it in on success.
#[derive(Debug, Default)]
pub struct MemoryAgendaStore {
    state: RwLock<MemoryState>,
}

impl MemoryAgendaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryTransaction<'s> {
    state: &'s mut MemoryState,
}

impl AgendaTransaction for MemoryTransaction<'_> {
    fn get_agenda(&mut self, token: &Token) -> Result<Option<Agenda>, ApiError> {
        Ok(self.state.agendas.get(token).cloned())
    }

    fn put_agenda(&mut self, agenda: &Agenda) -> Result<(), ApiError> {
        self.state
            .agendas
            .insert(agenda.token.clone(), agenda.clone());
        Ok(())
    }

    fn delete_schedules(&mut self, token: &Token) -> Result<usize, ApiError> {
        Ok(self
            .state
            .schedules
            .remove(token)
            .map(|s| s.len())
            .unwrap_or(0))
    }

    fn insert_schedule(
        &mut self,
        token: &Token,
        course_ids: &[CourseId],
    ) -> Result<ScheduleId, ApiError> {
        self.state.next_schedule_id += 1;
        let id = self.state.next_schedule_id;
        let owned = self.state.schedules.entry(token.clone()).or_default();
        owned.push(Schedule {
            id,
            agenda: token.clone(),
            position: owned.len() as u64,
            course_ids: course_ids.to_vec(),
        });
        Ok(id)
    }
}

impl AgendaStore for MemoryAgendaStore {
    fn get_agenda(&self, token: &Token) -> Result<Option<Agenda>, StorageError> {
        Ok(self.state.read().agendas.get(token).cloned())
    }

    fn put_agenda(&self, agenda: &Agenda) -> Result<(), StorageError> {
        self.state
            .write()
            .agendas
            .insert(agenda.token.clone(), agenda.clone());
        Ok(())
    }

    fn delete_agenda(&self, token: &Token) -> Result<bool, StorageError> {
        let mut state = self.state.write();
        state.schedules.remove(token);
        Ok(state.agendas.remove(token).is_some())
    }

    fn list_agendas(&self) -> Result<Vec<Agenda>, StorageError> {
        Ok(self.state.read().agendas.values().cloned().collect())
    }

    fn list_schedules(&self, token: &Token) -> Result<Vec<Schedule>, StorageError> {
        Ok(self
            .state
            .read()
            .schedules
            .get(token)
            .cloned()
            .unwrap_or_default())
    }

    fn atomically(&self, unit: &AtomicUnit<'_>) -> Result<(), ApiError> {
        let mut state = self.state.write();
        let mut snapshot = state.clone();
        unit(&mut MemoryTransaction {
            state: &mut snapshot,
        })?;
        *state = snapshot;
        Ok(())
    }
}
