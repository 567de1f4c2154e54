//! Generation orchestrator.
//!
//! Owns the agenda state machine (`idle -> processing -> idle`) and the atomic
//! regeneration unit. [`CombineService`] accepts combine requests, validates
//! them and hands a [`RegenerationTask`] to a [`Dispatcher`]. The dispatcher
//! eventually calls [`Regenerator::regenerate`], which replaces the agenda's
//! schedules in one store transaction.
//!
//! A failed regeneration leaves the agenda in `processing` with no
//! `combined_at`; that is the only failure signal the agenda carries.

use crate::access::{AccessGateway, AllowAll, Caller};
use crate::agenda::validation::validate_against_catalog;
use crate::agenda::{Agenda, Token};
use crate::catalog::CourseCatalog;
use crate::concurrency::AgendaLockManager;
use crate::course::Course;
use crate::dispatch::{Dispatcher, RegenerationTask};
use crate::enumerator::{count_candidates, generate_parallel};
use crate::error::ApiError;
use crate::partition::CoursePartition;
use crate::store::{AgendaStore, AgendaTransaction};
use crate::types::CourseId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Remainder pool size from which enumeration is sharded across threads.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 24;

/// Upper bound on an agenda's candidate courses.
pub const DEFAULT_MAX_CANDIDATE_COURSES: usize = 64;

/// Source of "now" for completion timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always answers the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Terminal transition of a regeneration run.
pub fn finish(agenda: &mut Agenda, now: DateTime<Utc>) {
    agenda.mark_as_finished_processing(now);
}

/// What one successful regeneration did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegenerationSummary {
    pub token: Token,
    pub mandatory: usize,
    pub remainder: usize,
    pub blocked: usize,
    /// Worst-case number of remainder subsets the search could visit.
    pub candidates: u64,
    pub schedules: usize,
    /// Schedules of the previous run that were replaced.
    pub replaced: usize,
    pub combined_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct RunCounts {
    mandatory: usize,
    remainder: usize,
    blocked: usize,
    candidates: u64,
    schedules: usize,
    replaced: usize,
}

/// Runs the replace-all-or-nothing unit for one agenda at a time.
pub struct Regenerator {
    store: Arc<dyn AgendaStore>,
    catalog: Arc<dyn CourseCatalog>,
    clock: Arc<dyn Clock>,
    locks: AgendaLockManager,
    parallel_threshold: usize,
}

impl Regenerator {
    pub fn new(store: Arc<dyn AgendaStore>, catalog: Arc<dyn CourseCatalog>) -> Self {
        Self {
            store,
            catalog,
            clock: Arc::new(SystemClock),
            locks: AgendaLockManager::new(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn store(&self) -> &Arc<dyn AgendaStore> {
        &self.store
    }

    /// Delete the agenda's schedules, enumerate afresh, insert the results in
    /// order and finish the agenda, all in one store transaction.
    ///
    /// Runs for the same token are serialized. Any error rolls the whole unit
    /// back and leaves the previous schedules and the `processing` flag as
    /// they were.
    pub fn regenerate(&self, token: &Token) -> Result<RegenerationSummary, ApiError> {
        let lock = self.locks.lock_for(token);
        let _guard = lock.lock();
        let started = Instant::now();

        let agenda = self.store.require_agenda(token)?;
        let catalog = self.catalog.courses(&agenda.term)?;
        let now = self.clock.now();
        let counts: RefCell<Option<RunCounts>> = RefCell::new(None);

        let result = self.store.atomically(&|tx: &mut dyn AgendaTransaction| {
            let mut agenda = tx
                .get_agenda(token)?
                .ok_or_else(|| ApiError::AgendaNotFound(token.clone()))?;
            // The record may have been edited since the request was accepted.
            agenda.validate().map_err(ApiError::Validation)?;
            let replaced = tx.delete_schedules(token)?;

            let courses = candidate_courses(&agenda, &catalog);
            let mandatory_ids = agenda.effective_mandatory_ids();
            let partition = CoursePartition::new(&courses, &mandatory_ids, &agenda.leaves);
            let blocked = partition.blocked().len();
            let (mandatory, remainder) = partition.into_candidates()?;

            let target = agenda.courses_per_schedule as usize;
            let combinations = generate_parallel(
                &mandatory,
                &remainder,
                &agenda.leaves,
                target,
                self.parallel_threshold,
            );
            for combination in &combinations {
                let ids: Vec<CourseId> = combination.iter().map(|course| course.id).collect();
                tx.insert_schedule(token, &ids)?;
            }

            finish(&mut agenda, now);
            tx.put_agenda(&agenda)?;

            *counts.borrow_mut() = Some(RunCounts {
                mandatory: mandatory.len(),
                remainder: remainder.len(),
                blocked,
                candidates: count_candidates(
                    remainder.len(),
                    target.saturating_sub(mandatory.len()),
                ),
                schedules: combinations.len(),
                replaced,
            });
            Ok(())
        });

        let duration_ms = started.elapsed().as_millis() as u64;
        if let Err(err) = result {
            error!(
                token = %token,
                duration_ms,
                error = %err,
                "Regeneration failed, agenda left processing"
            );
            return Err(err);
        }

        let counts = counts
            .into_inner()
            .ok_or_else(|| ApiError::Dispatch("regeneration unit did not run".to_string()))?;
        info!(
            token = %token,
            mandatory = counts.mandatory,
            remainder = counts.remainder,
            blocked = counts.blocked,
            candidates = counts.candidates,
            schedules = counts.schedules,
            replaced = counts.replaced,
            duration_ms,
            "Regenerated schedules"
        );
        self.locks.prune();

        Ok(RegenerationSummary {
            token: token.clone(),
            mandatory: counts.mandatory,
            remainder: counts.remainder,
            blocked: counts.blocked,
            candidates: counts.candidates,
            schedules: counts.schedules,
            replaced: counts.replaced,
            combined_at: now,
            duration_ms,
        })
    }
}

/// The agenda's candidate courses, in the agenda's order, resolved against the
/// term catalog. Ids the catalog no longer offers are skipped.
fn candidate_courses(agenda: &Agenda, catalog: &[Course]) -> Vec<Course> {
    let by_id: HashMap<CourseId, &Course> = catalog.iter().map(|c| (c.id, c)).collect();
    agenda
        .course_ids()
        .iter()
        .filter_map(|id| match by_id.get(id) {
            Some(course) => Some((*course).clone()),
            None => {
                warn!(token = %agenda.token, course_id = id, "Course missing from catalog");
                None
            }
        })
        .collect()
}

/// Accepts combine requests and schedules regeneration.
pub struct CombineService {
    store: Arc<dyn AgendaStore>,
    catalog: Arc<dyn CourseCatalog>,
    dispatcher: Arc<dyn Dispatcher>,
    gateway: Arc<dyn AccessGateway>,
    max_candidate_courses: usize,
}

impl CombineService {
    pub fn new(
        store: Arc<dyn AgendaStore>,
        catalog: Arc<dyn CourseCatalog>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            store,
            catalog,
            dispatcher,
            gateway: Arc::new(AllowAll),
            max_candidate_courses: DEFAULT_MAX_CANDIDATE_COURSES,
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn AccessGateway>) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_max_candidate_courses(mut self, limit: usize) -> Self {
        self.max_candidate_courses = limit;
        self
    }

    /// `idle -> processing`.
    ///
    /// Returns `Ok(false)` when the agenda fails validation; nothing is
    /// mutated or persisted in that case. Returns `Ok(true)` once the
    /// processing state is stored and a regeneration task is dispatched.
    pub fn request_combine(&self, agenda: &mut Agenda) -> Result<bool, ApiError> {
        match self.try_combine(agenda) {
            Ok(()) => Ok(true),
            Err(ApiError::Validation(violations)) => {
                debug!(
                    token = %agenda.token,
                    violations = violations.len(),
                    "Combine rejected by validation"
                );
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Like [`request_combine`](Self::request_combine), but reports the
    /// violations as [`ApiError::Validation`].
    pub fn try_combine(&self, agenda: &mut Agenda) -> Result<(), ApiError> {
        agenda.validate().map_err(ApiError::Validation)?;

        let offered: HashSet<CourseId> = self
            .catalog
            .courses(&agenda.term)?
            .iter()
            .map(|course| course.id)
            .collect();
        let violations = validate_against_catalog(agenda, &offered, self.max_candidate_courses);
        if !violations.is_empty() {
            return Err(ApiError::Validation(violations));
        }

        let previous = self.store.get_agenda(&agenda.token)?;
        let mut next = agenda.clone();
        next.begin_processing();
        self.store.put_agenda(&next)?;

        let task = RegenerationTask::new(next.token.clone());
        if let Err(err) = self.dispatcher.dispatch(task) {
            warn!(token = %next.token, error = %err, "Dispatch failed, restoring agenda");
            match previous {
                Some(previous) => self.store.put_agenda(&previous)?,
                None => {
                    self.store.delete_agenda(&next.token)?;
                }
            }
            return Err(err);
        }

        info!(
            token = %next.token,
            courses = next.course_ids().len(),
            mandatory = next.mandatory_course_ids().len(),
            leaves = next.leaves.len(),
            courses_per_schedule = next.courses_per_schedule,
            "Combine accepted"
        );
        *agenda = next;
        Ok(())
    }

    pub fn authorize(&self, caller: &Caller) -> Result<(), ApiError> {
        self.gateway.authorize(caller).map_err(|err| {
            warn!(caller = ?caller, "Combine refused by access gateway");
            err
        })
    }

    /// Check the access gateway, then [`request_combine`](Self::request_combine).
    pub fn combine_as(&self, caller: &Caller, agenda: &mut Agenda) -> Result<bool, ApiError> {
        self.authorize(caller)?;
        self.request_combine(agenda)
    }
}
