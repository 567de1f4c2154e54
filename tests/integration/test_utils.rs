//! Shared test utilities for integration tests
//!
//! Catalog fixtures, fault-injecting store wrappers and environment isolation.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use timetabler::agenda::{Agenda, Token};
use timetabler::catalog::InMemoryCatalog;
use timetabler::dispatch::{Dispatcher, RegenerationTask};
use timetabler::error::{ApiError, StorageError};
use timetabler::orchestrator::{FixedClock, Regenerator};
use timetabler::schedule::Schedule;
use timetabler::store::{AgendaStore, AgendaTransaction, AtomicUnit};
use timetabler::types::{CourseId, ScheduleId};
use timetabler::{Course, Interval};

pub const TERM: &str = "2016-1";

/// Serializes tests that touch HOME or TIMETABLER_* variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

pub fn course(id: CourseId, start: u32, end: u32) -> Course {
    Course::new(id, vec![Interval::new(start, end)])
}

/// A[10-12], B[13-15], C[10-12] as ids 1, 2, 3.
pub fn worked_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new().with_term(TERM, vec![course(1, 10, 12), course(2, 13, 15), course(3, 10, 12)])
}

/// Eight courses over two overlapping time bands plus a two-slot course.
pub fn wide_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new().with_term(
        TERM,
        vec![
            course(1, 480, 600),
            course(2, 540, 660),
            course(3, 600, 720),
            course(4, 720, 840),
            course(5, 780, 900),
            course(6, 900, 1020),
            course(7, 1020, 1140),
            Course::new(8, vec![Interval::new(2_000, 2_100), Interval::new(1_000, 1_050)]),
        ],
    )
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 2, 29, 18, 30, 0).unwrap()
}

pub fn regenerator(store: Arc<dyn AgendaStore>, catalog: InMemoryCatalog) -> Arc<Regenerator> {
    Arc::new(Regenerator::new(store, Arc::new(catalog)).with_clock(Arc::new(FixedClock(fixed_now()))))
}

pub fn new_agenda(courses: &[CourseId], mandatory: &[CourseId], per_schedule: u32) -> Agenda {
    let mut agenda = Agenda::new(TERM);
    agenda.set_course_ids(courses.iter().copied());
    agenda.set_mandatory_ids(mandatory.iter().copied());
    agenda.courses_per_schedule = per_schedule;
    agenda
}

pub fn course_ids(schedules: &[Schedule]) -> Vec<Vec<CourseId>> {
    schedules.iter().map(|s| s.course_ids.clone()).collect()
}

fn injected() -> ApiError {
    ApiError::StorageError(StorageError::IoError(io::Error::new(
        io::ErrorKind::Other,
        "injected storage failure",
    )))
}

/// Fails the first `failures` atomic units before running them.
pub struct FlakyStore<S> {
    pub inner: S,
    failures: AtomicUsize,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
        }
    }
}

/// Runs the unit but fails the insert after the first `inserts_ok` inserts.
pub struct FailingInsertStore<S> {
    pub inner: S,
    inserts_ok: usize,
}

impl<S> FailingInsertStore<S> {
    pub fn new(inner: S, inserts_ok: usize) -> Self {
        Self { inner, inserts_ok }
    }
}

struct FailingTx<'t> {
    inner: &'t mut dyn AgendaTransaction,
    inserts_left: usize,
}

impl AgendaTransaction for FailingTx<'_> {
    fn get_agenda(&mut self, token: &Token) -> Result<Option<Agenda>, ApiError> {
        self.inner.get_agenda(token)
    }

    fn put_agenda(&mut self, agenda: &Agenda) -> Result<(), ApiError> {
        self.inner.put_agenda(agenda)
    }

    fn delete_schedules(&mut self, token: &Token) -> Result<usize, ApiError> {
        self.inner.delete_schedules(token)
    }

    fn insert_schedule(&mut self, token: &Token, course_ids: &[CourseId]) -> Result<ScheduleId, ApiError> {
        if self.inserts_left == 0 {
            return Err(injected());
        }
        self.inserts_left -= 1;
        self.inner.insert_schedule(token, course_ids)
    }
}

macro_rules! delegate_reads {
    () => {
        fn get_agenda(&self, token: &Token) -> Result<Option<Agenda>, StorageError> {
            self.inner.get_agenda(token)
        }

        fn put_agenda(&self, agenda: &Agenda) -> Result<(), StorageError> {
            self.inner.put_agenda(agenda)
        }

        fn delete_agenda(&self, token: &Token) -> Result<bool, StorageError> {
            self.inner.delete_agenda(token)
        }

        fn list_agendas(&self) -> Result<Vec<Agenda>, StorageError> {
            self.inner.list_agendas()
        }

        fn list_schedules(&self, token: &Token) -> Result<Vec<Schedule>, StorageError> {
            self.inner.list_schedules(token)
        }
    };
}

impl<S: AgendaStore> AgendaStore for FlakyStore<S> {
    delegate_reads!();

    fn atomically(&self, unit: &AtomicUnit<'_>) -> Result<(), ApiError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(injected());
        }
        self.inner.atomically(unit)
    }
}

impl<S: AgendaStore> AgendaStore for FailingInsertStore<S> {
    delegate_reads!();

    fn atomically(&self, unit: &AtomicUnit<'_>) -> Result<(), ApiError> {
        self.inner.atomically(&|tx: &mut dyn AgendaTransaction| {
            let mut failing = FailingTx {
                inner: tx,
                inserts_left: self.inserts_ok,
            };
            unit(&mut failing)
        })
    }
}

/// Refuses every task.
pub struct RefusingDispatcher;

impl Dispatcher for RefusingDispatcher {
    fn dispatch(&self, _task: RegenerationTask) -> Result<(), ApiError> {
        Err(ApiError::Dispatch("dispatcher unavailable".to_string()))
    }
}

/// Run `f` with HOME pointed into `test_dir` and the given TIMETABLER_* vars set.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let original_home = std::env::var("HOME").ok();

    let home = test_dir.path().join("home");
    std::fs::create_dir_all(&home).unwrap();
    std::env::set_var("HOME", &home);
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    for (key, _) in vars {
        std::env::remove_var(key);
    }
    match original_home {
        Some(home) => std::env::set_var("HOME", home),
        None => std::env::remove_var("HOME"),
    }
    result
}
