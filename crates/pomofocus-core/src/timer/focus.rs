//! Timer driver that records sessions and raises notifications.
//!
//! `FocusTimer` wraps a `TimerEngine` and reacts to its events: a fresh
//! start opens a session record, every transition closes the open one and a
//! natural completion announces itself. Store failures are reported through
//! the notification sink and never undo the local transition.

use super::engine::TimerEngine;
use super::phase::Phase;
use crate::events::Event;
use crate::identity::IdentityProvider;
use crate::notify::{Notification, NotificationSink};
use crate::session::{SessionId, SessionRecorder};
use crate::storage::SessionStore;
use crate::task::TaskId;

pub struct FocusTimer<'a, S: SessionStore, I: IdentityProvider, N: NotificationSink> {
    engine: TimerEngine,
    recorder: SessionRecorder<'a, S, I>,
    sink: N,
    active_task: Option<TaskId>,
}

impl<'a, S, I, N> FocusTimer<'a, S, I, N>
where
    S: SessionStore,
    I: IdentityProvider,
    N: NotificationSink,
{
    pub fn new(engine: TimerEngine, recorder: SessionRecorder<'a, S, I>, sink: N) -> Self {
        Self {
            engine,
            recorder,
            sink,
            active_task: None,
        }
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn notifications(&self) -> &N {
        &self.sink
    }

    pub fn notifications_mut(&mut self) -> &mut N {
        &mut self.sink
    }

    pub fn active_task(&self) -> Option<&TaskId> {
        self.active_task.as_ref()
    }

    /// Task linked to sessions opened from now on.
    pub fn set_active_task(&mut self, task: Option<TaskId>) {
        self.active_task = task;
    }

    /// Clear the selection if it points at a deleted task.
    pub fn forget_task(&mut self, deleted: &TaskId) {
        if self.active_task.as_ref() == Some(deleted) {
            self.active_task = None;
        }
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot()
    }

    pub fn toggle(&mut self) -> Option<Event> {
        let event = self.engine.toggle()?;
        if let Event::TimerStarted { fresh: true, phase, .. } = event {
            self.open(phase);
        }
        Some(event)
    }

    pub fn tick(&mut self) -> Option<Event> {
        let event = self.engine.tick()?;
        if let Event::PhaseCompleted { phase, .. } = &event {
            let phase = *phase;
            self.close(event.ended_session());
            self.sink.notify(Notification::phase_completed(phase));
        }
        Some(event)
    }

    pub fn skip(&mut self) -> Option<Event> {
        let event = self.engine.skip()?;
        self.close(event.ended_session());
        Some(event)
    }

    pub fn select_phase(&mut self, phase: Phase) -> Option<Event> {
        let event = self.engine.select_phase(phase)?;
        self.close(event.ended_session());
        Some(event)
    }

    fn open(&mut self, phase: Phase) {
        match self.recorder.open_session(phase, self.active_task.as_ref()) {
            Ok(Some(id)) => {
                if let Some(stale) = self.engine.attach_session(id) {
                    self.close(Some(&stale));
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, phase = phase.as_str(), "failed to start session");
                self.sink.notify(Notification::error("Failed to start session"));
            }
        }
    }

    fn close(&mut self, id: Option<&SessionId>) {
        let Some(id) = id else { return };
        if let Err(e) = self.recorder.close_session(id) {
            tracing::error!(error = %e, session = %id, "failed to save session");
            self.sink.notify(Notification::error("Failed to save session"));
        }
    }
}
