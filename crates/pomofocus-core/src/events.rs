use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionId;
use crate::timer::Phase;

/// Every state change of the timer produces an Event.
/// The CLI prints them; the focus timer driver reacts to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Countdown went from stopped to running.
    ///
    /// `fresh` is true when the phase run had not elapsed at all and no
    /// session is attached yet, i.e. a session record should be opened.
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        fresh: bool,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero.
    PhaseCompleted {
        phase: Phase,
        next_phase: Phase,
        completed_focus_count: u32,
        ended_session: Option<SessionId>,
        at: DateTime<Utc>,
    },
    PhaseSkipped {
        from: Phase,
        to: Phase,
        ended_session: Option<SessionId>,
        at: DateTime<Utc>,
    },
    /// Manual phase override.
    PhaseSelected {
        from: Phase,
        to: Phase,
        ended_session: Option<SessionId>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        remaining_secs: u64,
        nominal_secs: u64,
        display: String,
        progress: f64,
        is_running: bool,
        completed_focus_count: u32,
        open_session: Option<SessionId>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Session whose run ended with this event, if any.
    pub fn ended_session(&self) -> Option<&SessionId> {
        match self {
            Event::PhaseCompleted { ended_session, .. }
            | Event::PhaseSkipped { ended_session, .. }
            | Event::PhaseSelected { ended_session, .. } => ended_session.as_ref(),
            _ => None,
        }
    }
}
