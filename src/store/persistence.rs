//! Persistence layer for the Agenda Store

use crate::agenda::{Agenda, Token};
use crate::error::{ApiError, StorageError};
use crate::schedule::Schedule;
use crate::store::records::{AgendaRecord, ScheduleRecord};
use crate::store::{AgendaStore, AgendaTransaction, AtomicUnit};
use crate::types::{CourseId, ScheduleId};
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree, UnabortableTransactionError,
};
use sled::{Db, Transactional, Tree};
use std::io;
use std::path::Path;

const TREE_AGENDAS: &str = "agendas";
const TREE_SCHEDULES: &str = "schedules";
const TREE_SCHEDULE_INDEX: &str = "schedule_index";
const NEXT_SCHEDULE_ID_KEY: &[u8] = b"\0next_schedule_id";
const POSITION_PAD: usize = 20;

/// Sled-based implementation of AgendaStore
///
/// Trees:
/// - `agendas`: token → JSON agenda record
/// - `schedules`: `{token}:{position}` → bincode schedule record
/// - `schedule_index`: token → schedule count, plus the schedule id counter
#[derive(Clone)]
pub struct SledAgendaStore {
    db: Db,
    agendas: Tree,
    schedules: Tree,
    index: Tree,
}

impl SledAgendaStore {
    /// Open (or create) a store at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let agendas = db.open_tree(TREE_AGENDAS).map_err(to_storage_io)?;
        let schedules = db.open_tree(TREE_SCHEDULES).map_err(to_storage_io)?;
        let index = db.open_tree(TREE_SCHEDULE_INDEX).map_err(to_storage_io)?;
        Ok(Self {
            db,
            agendas,
            schedules,
            index,
        })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }

    pub fn encode_schedule_key(token: &Token, position: u64) -> String {
        encode_schedule_key(token, position)
    }
}

impl AgendaStore for SledAgendaStore {
    fn get_agenda(&self, token: &Token) -> Result<Option<Agenda>, StorageError> {
        let Some(raw) = self.agendas.get(token.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        Ok(Some(AgendaRecord::decode(&raw)?.into_agenda()))
    }

    fn put_agenda(&self, agenda: &Agenda) -> Result<(), StorageError> {
        let value = AgendaRecord::from(agenda).encode()?;
        self.agendas
            .insert(agenda.token.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn delete_agenda(&self, token: &Token) -> Result<bool, StorageError> {
        let result = (&self.agendas, &self.schedules, &self.index).transaction(
            |(agendas, schedules, index)| {
                let existed = agendas.remove(token.as_bytes())?.is_some();
                let count = read_count(index, token)?;
                for position in 0..count {
                    schedules.remove(encode_schedule_key(token, position).as_bytes())?;
                }
                index.remove(token.as_bytes())?;
                Ok::<bool, ConflictableTransactionError<StorageError>>(existed)
            },
        );
        result.map_err(flatten_transaction_error)
    }

    fn list_agendas(&self) -> Result<Vec<Agenda>, StorageError> {
        let mut out = Vec::new();
        for item in self.agendas.iter() {
            let (_, value) = item.map_err(to_storage_io)?;
            out.push(AgendaRecord::decode(&value)?.into_agenda());
        }
        Ok(out)
    }

    fn list_schedules(&self, token: &Token) -> Result<Vec<Schedule>, StorageError> {
        // Read count and rows in one transaction so a concurrent replace is
        // observed either fully or not at all.
        let result = (&self.schedules, &self.index).transaction(|(schedules, index)| {
            let count = read_count(index, token)?;
            let mut rows = Vec::with_capacity(count as usize);
            for position in 0..count {
                if let Some(raw) = schedules.get(encode_schedule_key(token, position).as_bytes())? {
                    rows.push(raw.to_vec());
                }
            }
            Ok::<Vec<Vec<u8>>, ConflictableTransactionError<StorageError>>(rows)
        });
        let rows = result.map_err(flatten_transaction_error)?;
        rows.iter()
            .map(|raw| ScheduleRecord::decode(raw).map(ScheduleRecord::into_schedule))
            .collect()
    }

    fn has_schedules(&self, token: &Token) -> Result<bool, StorageError> {
        let Some(raw) = self.index.get(token.as_bytes()).map_err(to_storage_io)? else {
            return Ok(false);
        };
        Ok(decode_u64(&raw)? > 0)
    }

    fn atomically(&self, unit: &AtomicUnit<'_>) -> Result<(), ApiError> {
        let result = (&self.agendas, &self.schedules, &self.index).transaction(
            |(agendas, schedules, index)| {
                let mut tx = SledTransaction {
                    agendas,
                    schedules,
                    index,
                    conflicted: false,
                };
                match unit(&mut tx) {
                    Ok(()) => Ok(()),
                    // let sled rerun the unit on a write conflict
                    Err(_) if tx.conflicted => Err(ConflictableTransactionError::Conflict),
                    Err(e) => Err(ConflictableTransactionError::Abort(e)),
                }
            },
        );
        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(ApiError::StorageError(to_storage_io(e))),
        }
    }
}

struct SledTransaction<'t> {
    agendas: &'t TransactionalTree,
    schedules: &'t TransactionalTree,
    index: &'t TransactionalTree,
    conflicted: bool,
}

impl SledTransaction<'_> {
    fn check<T>(
        &mut self,
        result: Result<T, UnabortableTransactionError>,
    ) -> Result<T, ApiError> {
        result.map_err(|e| match e {
            UnabortableTransactionError::Conflict => {
                self.conflicted = true;
                ApiError::StorageError(StorageError::IoError(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "transaction conflict",
                )))
            }
            UnabortableTransactionError::Storage(e) => ApiError::StorageError(to_storage_io(e)),
        })
    }

    fn count(&mut self, token: &Token) -> Result<u64, ApiError> {
        let raw = self.index.get(token.as_bytes());
        match self.check(raw)? {
            Some(raw) => Ok(decode_u64(&raw)?),
            None => Ok(0),
        }
    }

    fn next_schedule_id(&mut self) -> Result<ScheduleId, ApiError> {
        let raw = self.index.get(NEXT_SCHEDULE_ID_KEY);
        let current = match self.check(raw)? {
            Some(raw) => decode_u64(&raw)?,
            None => 0,
        };
        let next = current + 1;
        let write = self.index.insert(NEXT_SCHEDULE_ID_KEY, &next.to_be_bytes()[..]);
        self.check(write)?;
        Ok(next)
    }
}

impl AgendaTransaction for SledTransaction<'_> {
    fn get_agenda(&mut self, token: &Token) -> Result<Option<Agenda>, ApiError> {
        let raw = self.agendas.get(token.as_bytes());
        match self.check(raw)? {
            Some(raw) => Ok(Some(AgendaRecord::decode(&raw)?.into_agenda())),
            None => Ok(None),
        }
    }

    fn put_agenda(&mut self, agenda: &Agenda) -> Result<(), ApiError> {
        let value = AgendaRecord::from(agenda).encode()?;
        let write = self.agendas.insert(agenda.token.as_bytes(), value);
        self.check(write)?;
        Ok(())
    }

    fn delete_schedules(&mut self, token: &Token) -> Result<usize, ApiError> {
        let count = self.count(token)?;
        for position in 0..count {
            let removed = self
                .schedules
                .remove(encode_schedule_key(token, position).as_bytes());
            self.check(removed)?;
        }
        let removed = self.index.remove(token.as_bytes());
        self.check(removed)?;
        Ok(count as usize)
    }

    fn insert_schedule(
        &mut self,
        token: &Token,
        course_ids: &[CourseId],
    ) -> Result<ScheduleId, ApiError> {
        let position = self.count(token)?;
        let id = self.next_schedule_id()?;
        let record = ScheduleRecord::from(&Schedule {
            id,
            agenda: token.clone(),
            position,
            course_ids: course_ids.to_vec(),
        });
        let write = self.schedules.insert(
            encode_schedule_key(token, position).as_bytes(),
            record.encode()?,
        );
        self.check(write)?;
        let write = self
            .index
            .insert(token.as_bytes(), &(position + 1).to_be_bytes()[..]);
        self.check(write)?;
        Ok(id)
    }
}

fn encode_schedule_key(token: &Token, position: u64) -> String {
    format!("{token}:{position:0POSITION_PAD$}")
}

fn read_count(
    index: &TransactionalTree,
    token: &Token,
) -> Result<u64, ConflictableTransactionError<StorageError>> {
    match index.get(token.as_bytes())? {
        Some(raw) => decode_u64(&raw).map_err(ConflictableTransactionError::Abort),
        None => Ok(0),
    }
}

fn decode_u64(raw: &[u8]) -> Result<u64, StorageError> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| StorageError::Decode {
        what: "schedule index",
        message: format!("expected 8 bytes, got {}", raw.len()),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

fn flatten_transaction_error(err: TransactionError<StorageError>) -> StorageError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => to_storage_io(e),
    }
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}
