//! End-to-end combine requests through the service, dispatcher and store.

use crate::integration::test_utils::*;
use std::sync::Arc;
use timetabler::access::{AdminSessions, Caller};
use timetabler::catalog::{CourseCatalog, InMemoryCatalog};
use timetabler::course::pairwise_compatible;
use timetabler::dispatch::InlineDispatcher;
use timetabler::store::{AgendaStore, MemoryAgendaStore};
use timetabler::{AgendaState, ApiError, CombineService, Leave};

struct Harness {
    store: Arc<dyn AgendaStore>,
    dispatcher: Arc<InlineDispatcher>,
    service: CombineService,
}

fn harness_with(store: Arc<dyn AgendaStore>, catalog: InMemoryCatalog) -> Harness {
    let dispatcher = Arc::new(InlineDispatcher::new(regenerator(
        Arc::clone(&store),
        catalog.clone(),
    )));
    let service = CombineService::new(Arc::clone(&store), Arc::new(catalog), dispatcher.clone());
    Harness {
        store,
        dispatcher,
        service,
    }
}

fn harness(catalog: InMemoryCatalog) -> Harness {
    harness_with(Arc::new(MemoryAgendaStore::new()), catalog)
}

#[test]
fn test_worked_example_produces_single_schedule() {
    let h = harness(worked_catalog());
    let mut agenda = new_agenda(&[1, 2, 3], &[1], 2);

    assert!(h.service.request_combine(&mut agenda).unwrap());

    let summary = h.dispatcher.take_outcome().unwrap().unwrap();
    assert_eq!(summary.mandatory, 1);
    assert_eq!(summary.remainder, 2);
    assert_eq!(summary.schedules, 1);
    assert_eq!(summary.combined_at, fixed_now());

    let stored = h.store.require_agenda(&agenda.token).unwrap();
    assert_eq!(stored.state(), AgendaState::Idle);
    assert_eq!(stored.combined_at(), Some(fixed_now()));
    let schedules = h.store.list_schedules(&agenda.token).unwrap();
    assert_eq!(course_ids(&schedules), vec![vec![1, 2]]);
    assert!(schedules.iter().all(|s| s.agenda == agenda.token));
}

#[test]
fn test_blocked_mandatory_keeps_previous_schedules() {
    let h = harness(worked_catalog());
    let mut agenda = new_agenda(&[1, 2, 3], &[1], 2);
    assert!(h.service.request_combine(&mut agenda).unwrap());
    h.dispatcher.take_outcome();
    let before = h.store.list_schedules(&agenda.token).unwrap();

    let mut agenda = h.store.require_agenda(&agenda.token).unwrap();
    agenda.leaves = vec![Leave::new(9, 11)];
    assert!(h.service.request_combine(&mut agenda).unwrap());

    let outcome = h.dispatcher.take_outcome().unwrap();
    assert!(matches!(outcome, Err(ApiError::MandatoryBlocked(ref ids)) if ids == &vec![1]));

    let stored = h.store.require_agenda(&agenda.token).unwrap();
    assert!(stored.is_processing());
    assert_eq!(stored.combined_at(), None);
    assert_eq!(h.store.list_schedules(&agenda.token).unwrap(), before);
}

#[test]
fn test_invalid_agenda_is_rejected_without_side_effects() {
    let h = harness(worked_catalog());
    let mut agenda = new_agenda(&[1, 2, 3], &[1], 2);
    assert!(h.service.request_combine(&mut agenda).unwrap());
    h.dispatcher.take_outcome();
    let before = h.store.require_agenda(&agenda.token).unwrap();
    let schedules = h.store.list_schedules(&agenda.token).unwrap();

    let mut invalid = before.clone();
    invalid.courses_per_schedule = 0;
    assert!(!h.service.request_combine(&mut invalid).unwrap());
    assert!(!invalid.is_processing());
    assert!(h.dispatcher.take_outcome().is_none());

    assert_eq!(h.store.require_agenda(&agenda.token).unwrap(), before);
    assert_eq!(h.store.list_schedules(&agenda.token).unwrap(), schedules);
}

#[test]
fn test_overlapping_leaves_are_rejected() {
    let h = harness(worked_catalog());
    let mut agenda = new_agenda(&[1, 2, 3], &[], 1);
    agenda.leaves = vec![Leave::new(100, 200), Leave::new(150, 250)];

    assert!(!h.service.request_combine(&mut agenda).unwrap());
    assert!(h.store.get_agenda(&agenda.token).unwrap().is_none());
}

#[test]
fn test_rerun_reproduces_identical_schedules() {
    let h = harness(wide_catalog());
    let mut agenda = new_agenda(&[1, 2, 3, 4, 5, 6, 7, 8], &[4], 3);

    assert!(h.service.request_combine(&mut agenda).unwrap());
    let first = course_ids(&h.store.list_schedules(&agenda.token).unwrap());
    assert!(!first.is_empty());

    let mut agenda = h.store.require_agenda(&agenda.token).unwrap();
    assert!(h.service.request_combine(&mut agenda).unwrap());
    let summary = h.dispatcher.take_outcome().unwrap().unwrap();
    assert_eq!(summary.replaced, first.len());

    let second = h.store.list_schedules(&agenda.token).unwrap();
    assert_eq!(course_ids(&second), first);
    let positions: Vec<u64> = second.iter().map(|s| s.position).collect();
    assert_eq!(positions, (0..first.len() as u64).collect::<Vec<_>>());
}

#[test]
fn test_every_schedule_honours_the_constraints() {
    let catalog = wide_catalog();
    let h = harness(catalog.clone());
    let mut agenda = new_agenda(&[1, 2, 3, 4, 5, 6, 7, 8], &[8], 3);
    agenda.leaves = vec![Leave::new(500, 560)];

    assert!(h.service.request_combine(&mut agenda).unwrap());
    let schedules = h.store.list_schedules(&agenda.token).unwrap();
    assert!(!schedules.is_empty());

    let courses = catalog.courses(TERM).unwrap();
    for schedule in &schedules {
        assert_eq!(schedule.course_ids.len(), 3);
        assert!(schedule.contains(8));
        let picked: Vec<_> = courses
            .iter()
            .filter(|c| schedule.contains(c.id))
            .collect();
        assert!(pairwise_compatible(picked.iter().copied()));
        assert!(picked.iter().all(|c| !c.overlaps_any_leave(&agenda.leaves)));
    }
}

#[test]
fn test_storage_failure_mid_unit_rolls_back() {
    // Refuses the second schedule insert of every unit.
    let failing: Arc<dyn AgendaStore> =
        Arc::new(FailingInsertStore::new(MemoryAgendaStore::new(), 1));
    let h = harness_with(failing, worked_catalog());
    let mut agenda = new_agenda(&[1, 2, 3], &[], 1);
    assert!(h.service.request_combine(&mut agenda).unwrap());

    let outcome = h.dispatcher.take_outcome().unwrap();
    assert!(outcome.unwrap_err().is_retryable());
    let stored = h.store.require_agenda(&agenda.token).unwrap();
    assert!(stored.is_processing());
    assert!(h.store.list_schedules(&agenda.token).unwrap().is_empty());
}

#[test]
fn test_dispatch_failure_restores_previous_record() {
    let store: Arc<dyn AgendaStore> = Arc::new(MemoryAgendaStore::new());
    let h = harness_with(Arc::clone(&store), worked_catalog());
    let mut agenda = new_agenda(&[1, 2, 3], &[1], 2);
    assert!(h.service.request_combine(&mut agenda).unwrap());
    let before = store.require_agenda(&agenda.token).unwrap();

    let refusing = CombineService::new(
        Arc::clone(&store),
        Arc::new(worked_catalog()),
        Arc::new(RefusingDispatcher),
    );
    let mut again = before.clone();
    assert!(matches!(
        refusing.request_combine(&mut again),
        Err(ApiError::Dispatch(_))
    ));
    assert_eq!(store.require_agenda(&agenda.token).unwrap(), before);

    let mut fresh = new_agenda(&[2], &[], 1);
    assert!(refusing.request_combine(&mut fresh).is_err());
    assert!(store.get_agenda(&fresh.token).unwrap().is_none());
}

#[test]
fn test_course_dropped_from_catalog_is_skipped() {
    let store: Arc<dyn AgendaStore> = Arc::new(MemoryAgendaStore::new());
    let shrunk = InMemoryCatalog::new().with_term(TERM, vec![course(1, 10, 12), course(2, 13, 15)]);
    let dispatcher = Arc::new(InlineDispatcher::new(regenerator(Arc::clone(&store), shrunk)));
    let service = CombineService::new(Arc::clone(&store), Arc::new(worked_catalog()), dispatcher.clone());

    let mut agenda = new_agenda(&[1, 2, 3], &[], 1);
    assert!(service.request_combine(&mut agenda).unwrap());

    let summary = dispatcher.take_outcome().unwrap().unwrap();
    assert_eq!(summary.remainder, 2);
    let schedules = store.list_schedules(&agenda.token).unwrap();
    assert_eq!(course_ids(&schedules), vec![vec![1], vec![2]]);
}

#[test]
fn test_gateway_refuses_unknown_callers() {
    let h = harness(worked_catalog());
    let service = h
        .service
        .with_gateway(Arc::new(AdminSessions::new(["admin-1".to_string()])));

    let mut agenda = new_agenda(&[1, 2, 3], &[1], 2);
    assert!(matches!(
        service.combine_as(&Caller::Anonymous, &mut agenda),
        Err(ApiError::Unauthorized(_))
    ));
    assert!(h.store.get_agenda(&agenda.token).unwrap().is_none());

    assert!(service
        .combine_as(&Caller::from_session(Some("admin-1".to_string())), &mut agenda)
        .unwrap());
    assert_eq!(h.store.list_schedules(&agenda.token).unwrap().len(), 1);
}

#[test]
fn test_candidate_limit_is_a_validation_failure() {
    let h = harness(wide_catalog());
    let service = h.service.with_max_candidate_courses(4);
    let mut agenda = new_agenda(&[1, 2, 3, 4, 5], &[], 2);

    assert!(!service.request_combine(&mut agenda).unwrap());
    assert!(matches!(
        service.try_combine(&mut agenda),
        Err(ApiError::Validation(_))
    ));
}
