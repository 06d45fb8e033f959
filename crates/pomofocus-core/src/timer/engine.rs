//! Phase state machine.
//!
//! The engine counts whole seconds. It does not use internal threads - the
//! caller is responsible for calling `tick()` once per elapsed second while
//! the timer is running.
//!
//! ## Transitions
//!
//! ```text
//! Focus --expire--> ShortRest | LongRest --expire--> Focus
//! ```
//!
//! Every `long_break_every`-th completed focus run is followed by a long
//! rest. `skip()` follows the same rule without counting the run, and
//! `select_phase()` jumps anywhere.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(PhaseDurations::default());
//! engine.toggle();
//! // Once per second:
//! engine.tick(); // Returns Some(Event::PhaseCompleted { .. }) at zero
//! ```

use chrono::Utc;

use super::phase::{format_mmss, Phase, PhaseDurations};
use crate::events::Event;
use crate::session::SessionId;

/// Transient timer state. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    pub phase: Phase,
    pub remaining_secs: u64,
    pub is_running: bool,
    pub completed_focus_count: u32,
    pub open_session: Option<SessionId>,
}

/// Core phase state machine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    durations: PhaseDurations,
    state: TimerState,
}

impl TimerEngine {
    /// Create a stopped engine at the start of a focus phase.
    pub fn new(durations: PhaseDurations) -> Self {
        Self {
            state: TimerState {
                phase: Phase::Focus,
                remaining_secs: durations.nominal(Phase::Focus),
                is_running: false,
                completed_focus_count: 0,
                open_session: None,
            },
            durations,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.state.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn completed_focus_count(&self) -> u32 {
        self.state.completed_focus_count
    }

    pub fn open_session(&self) -> Option<&SessionId> {
        self.state.open_session.as_ref()
    }

    pub fn durations(&self) -> &PhaseDurations {
        &self.durations
    }

    pub fn nominal_secs(&self) -> u64 {
        self.durations.nominal(self.state.phase)
    }

    /// True while the current phase run has not elapsed at all.
    pub fn is_at_start(&self) -> bool {
        self.state.remaining_secs == self.nominal_secs()
    }

    /// Fraction of the phase still remaining, clamped to 0.0 ..= 1.0.
    pub fn progress(&self) -> f64 {
        let nominal = self.nominal_secs();
        if nominal == 0 {
            return 0.0;
        }
        (self.state.remaining_secs as f64 / nominal as f64).clamp(0.0, 1.0)
    }

    pub fn display(&self) -> String {
        format_mmss(self.state.remaining_secs)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_secs,
            nominal_secs: self.nominal_secs(),
            display: self.display(),
            progress: self.progress(),
            is_running: self.state.is_running,
            completed_focus_count: self.state.completed_focus_count,
            open_session: self.state.open_session.clone(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or pause the countdown.
    pub fn toggle(&mut self) -> Option<Event> {
        if self.state.is_running {
            self.state.is_running = false;
            return Some(Event::TimerPaused {
                phase: self.state.phase,
                remaining_secs: self.state.remaining_secs,
                at: Utc::now(),
            });
        }

        // A run that was started and paused before the first tick keeps
        // its session.
        let fresh = self.is_at_start() && self.state.open_session.is_none();
        self.state.is_running = true;
        Some(Event::TimerStarted {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_secs,
            fresh,
            at: Utc::now(),
        })
    }

    /// Attach the record opened for the current run.
    ///
    /// Returns the previously attached id, which the caller must close.
    pub fn attach_session(&mut self, id: SessionId) -> Option<SessionId> {
        self.state.open_session.replace(id)
    }

    /// Advance one second. Returns `Some(Event::PhaseCompleted)` when the
    /// countdown reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        self.state.remaining_secs = self.state.remaining_secs.saturating_sub(1);
        if self.state.remaining_secs == 0 {
            return Some(self.complete());
        }
        None
    }

    /// Move to the next phase without counting the current run.
    pub fn skip(&mut self) -> Option<Event> {
        let from = self.state.phase;
        let to = self
            .durations
            .next_phase(from, self.state.completed_focus_count.wrapping_add(1));
        let ended_session = self.enter(to);
        Some(Event::PhaseSkipped {
            from,
            to,
            ended_session,
            at: Utc::now(),
        })
    }

    /// Manual override: stop, switch to `phase` and reset its countdown.
    pub fn select_phase(&mut self, phase: Phase) -> Option<Event> {
        let from = self.state.phase;
        let ended_session = self.enter(phase);
        Some(Event::PhaseSelected {
            from,
            to: phase,
            ended_session,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self) -> Event {
        let phase = self.state.phase;
        if phase == Phase::Focus {
            self.state.completed_focus_count = self.state.completed_focus_count.wrapping_add(1);
        }
        let next_phase = self
            .durations
            .next_phase(phase, self.state.completed_focus_count);
        let ended_session = self.enter(next_phase);
        Event::PhaseCompleted {
            phase,
            next_phase,
            completed_focus_count: self.state.completed_focus_count,
            ended_session,
            at: Utc::now(),
        }
    }

    /// Stop and load `phase` at its full length, detaching any open session.
    fn enter(&mut self, phase: Phase) -> Option<SessionId> {
        self.state.is_running = false;
        self.state.phase = phase;
        self.state.remaining_secs = self.durations.nominal(phase);
        self.state.open_session.take()
    }
}
