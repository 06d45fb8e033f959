//! End-to-end timer cycles against an in-memory database.
//!
//! Every test drives a `FocusTimer` the way the CLI loop does: toggle, then
//! tick until the phase completes.

use pomofocus_core::storage::{Database, SessionStore, TaskStore};
use pomofocus_core::{
    Event, FocusTimer, NotificationQueue, Phase, PhaseDurations, SessionQuery, SessionRecorder,
    StaticIdentity, TimerEngine, UserRef,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn ada() -> UserRef {
    UserRef::new("ada").unwrap()
}

fn durations() -> PhaseDurations {
    PhaseDurations::new(4, 2, 3, 4).unwrap()
}

fn finish_phase<S, I>(timer: &mut FocusTimer<'_, S, I, NotificationQueue>) -> Event
where
    S: SessionStore,
    I: pomofocus_core::IdentityProvider,
{
    if !timer.engine().is_running() {
        timer.toggle();
    }
    loop {
        if let Some(event) = timer.tick() {
            return event;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn four_focus_runs_reach_long_rest_and_record_sessions() {
    let db = Database::open_memory().unwrap();
    let identity = StaticIdentity::signed_in(ada());
    let mut timer = FocusTimer::new(
        TimerEngine::new(durations()),
        SessionRecorder::new(&db, &identity),
        NotificationQueue::new(16),
    );

    let mut phases = vec![timer.engine().phase()];
    for _ in 0..7 {
        finish_phase(&mut timer);
        phases.push(timer.engine().phase());
    }

    assert_eq!(
        phases,
        vec![
            Phase::Focus,
            Phase::ShortRest,
            Phase::Focus,
            Phase::ShortRest,
            Phase::Focus,
            Phase::ShortRest,
            Phase::Focus,
            Phase::LongRest,
        ]
    );
    assert_eq!(timer.engine().completed_focus_count(), 4);

    let all = db.query_sessions(&ada(), &SessionQuery::default()).unwrap();
    assert_eq!(all.len(), 7);
    assert!(all.iter().all(|r| r.is_closed()));
    let focus = db
        .query_sessions(&ada(), &SessionQuery::completed_focus())
        .unwrap();
    assert_eq!(focus.len(), 4);

    let notes = timer.notifications_mut().drain();
    assert_eq!(notes.len(), 7);
    assert_eq!(notes[0].title, "Focus completed!");
    assert_eq!(notes[1].title, "Short Break completed!");
}

#[test]
fn resuming_mid_phase_creates_no_extra_record() {
    let db = Database::open_memory().unwrap();
    let identity = StaticIdentity::signed_in(ada());
    let mut timer = FocusTimer::new(
        TimerEngine::new(durations()),
        SessionRecorder::new(&db, &identity),
        NotificationQueue::default(),
    );

    timer.toggle();
    timer.tick();
    for _ in 0..3 {
        timer.toggle();
        timer.toggle();
    }
    assert_eq!(
        db.query_sessions(&ada(), &SessionQuery::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn sessions_link_the_selected_task() {
    let db = Database::open_memory().unwrap();
    let identity = StaticIdentity::signed_in(ada());
    let task = db.create_task(&ada(), "Write chapter 3").unwrap();
    let mut timer = FocusTimer::new(
        TimerEngine::new(durations()),
        SessionRecorder::new(&db, &identity),
        NotificationQueue::default(),
    );
    timer.set_active_task(Some(task.id.clone()));
    finish_phase(&mut timer);

    db.delete_task(&ada(), &task.id).unwrap();
    timer.forget_task(&task.id);
    finish_phase(&mut timer);

    let records = db.query_sessions(&ada(), &SessionQuery::default()).unwrap();
    let focus = records.iter().find(|r| r.phase == Phase::Focus).unwrap();
    let rest = records.iter().find(|r| r.phase == Phase::ShortRest).unwrap();
    assert_eq!(focus.task_id, Some(task.id));
    assert_eq!(rest.task_id, None);
}

#[test]
fn live_query_sees_each_completed_focus() {
    let db = Database::open_memory().unwrap();
    let identity = StaticIdentity::signed_in(ada());
    let mut rx = db
        .watch_sessions(&ada(), SessionQuery::completed_focus())
        .unwrap();
    let mut timer = FocusTimer::new(
        TimerEngine::new(durations()),
        SessionRecorder::new(&db, &identity),
        NotificationQueue::default(),
    );

    finish_phase(&mut timer);
    assert_eq!(rx.borrow_and_update().len(), 1);
    finish_phase(&mut timer);
    // A finished rest refreshes the query without changing its result.
    assert_eq!(rx.borrow_and_update().len(), 1);
    finish_phase(&mut timer);
    assert_eq!(rx.borrow_and_update().len(), 2);
}
