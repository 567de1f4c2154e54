//! Storage records and their codecs.
//!
//! Agendas are stored as JSON, schedules as bincode. Both carry a version so a
//! reader can reject records written by an incompatible build.

use crate::agenda::{Agenda, Token};
use crate::error::StorageError;
use crate::leave::Leave;
use crate::schedule::Schedule;
use crate::types::{CourseId, Minute, ScheduleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const AGENDA_RECORD_VERSION: u32 = 1;
pub const SCHEDULE_RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRecord {
    pub starts_at: Minute,
    pub ends_at: Minute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaRecord {
    pub version: u32,
    pub token: String,
    pub term: String,
    pub course_ids: Vec<CourseId>,
    pub mandatory_course_ids: Vec<CourseId>,
    pub leaves: Vec<LeaveRecord>,
    pub courses_per_schedule: u32,
    pub processing: bool,
    pub combined_at: Option<DateTime<Utc>>,
}

impl From<&Agenda> for AgendaRecord {
    fn from(agenda: &Agenda) -> Self {
        Self {
            version: AGENDA_RECORD_VERSION,
            token: agenda.token.to_string(),
            term: agenda.term.clone(),
            course_ids: agenda.course_ids().to_vec(),
            mandatory_course_ids: agenda.mandatory_course_ids().iter().copied().collect(),
            leaves: agenda
                .leaves
                .iter()
                .map(|l| LeaveRecord {
                    starts_at: l.starts_at,
                    ends_at: l.ends_at,
                })
                .collect(),
            courses_per_schedule: agenda.courses_per_schedule,
            processing: agenda.is_processing(),
            combined_at: agenda.combined_at(),
        }
    }
}

impl AgendaRecord {
    pub fn encode(&self) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec(self).map_err(|e| StorageError::Encode {
            what: "agenda",
            message: e.to_string(),
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        let record: AgendaRecord =
            serde_json::from_slice(bytes).map_err(|e| StorageError::Decode {
                what: "agenda",
                message: e.to_string(),
            })?;
        if record.version != AGENDA_RECORD_VERSION {
            return Err(StorageError::UnsupportedVersion {
                what: "agenda",
                version: record.version,
            });
        }
        Ok(record)
    }

    pub fn into_agenda(self) -> Agenda {
        Agenda::restore(
            Token::from(self.token),
            self.term,
            self.course_ids,
            self.mandatory_course_ids.into_iter().collect(),
            self.leaves
                .into_iter()
                .map(|l| Leave::new(l.starts_at, l.ends_at))
                .collect(),
            self.courses_per_schedule,
            self.processing,
            self.combined_at,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub version: u32,
    pub id: ScheduleId,
    pub agenda: String,
    pub position: u64,
    pub course_ids: Vec<CourseId>,
}

impl From<&Schedule> for ScheduleRecord {
    fn from(schedule: &Schedule) -> Self {
        Self {
            version: SCHEDULE_RECORD_VERSION,
            id: schedule.id,
            agenda: schedule.agenda.to_string(),
            position: schedule.position,
            course_ids: schedule.course_ids.clone(),
        }
    }
}

impl ScheduleRecord {
    pub fn encode(&self) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(self).map_err(|e| StorageError::Encode {
            what: "schedule",
            message: e.to_string(),
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        let record: ScheduleRecord =
            bincode::deserialize(bytes).map_err(|e| StorageError::Decode {
                what: "schedule",
                message: e.to_string(),
            })?;
        if record.version != SCHEDULE_RECORD_VERSION {
            return Err(StorageError::UnsupportedVersion {
                what: "schedule",
                version: record.version,
            });
        }
        Ok(record)
    }

    pub fn into_schedule(self) -> Schedule {
        Schedule {
            id: self.id,
            agenda: Token::from(self.agenda),
            position: self.position,
            course_ids: self.course_ids,
        }
    }
}
