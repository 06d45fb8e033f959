//! Session records and the recorder that opens and closes them.

mod recorder;

pub use recorder::SessionRecorder;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskId;
use crate::timer::Phase;

/// Store-generated identifier of a session record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One phase run as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    /// `None` while the run is still open.
    pub end_time: Option<DateTime<Utc>>,
    pub phase: Phase,
    pub task_id: Option<TaskId>,
}

impl SessionRecord {
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Closed focus run, the only kind that counts toward statistics.
    pub fn is_completed_focus(&self) -> bool {
        self.phase == crate::timer::Phase::Focus && self.is_closed()
    }
}

/// Filter for session listings and live subscriptions.
///
/// Results are always ordered by `start_time` ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionQuery {
    pub phase: Option<Phase>,
    pub closed_only: bool,
    pub since: Option<DateTime<Utc>>,
}

impl SessionQuery {
    /// Closed focus sessions, the input of the statistics calculator.
    pub fn completed_focus() -> Self {
        Self {
            phase: Some(Phase::Focus),
            closed_only: true,
            since: None,
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn matches(&self, record: &SessionRecord) -> bool {
        if let Some(phase) = self.phase {
            if record.phase != phase {
                return false;
            }
        }
        if self.closed_only && !record.is_closed() {
            return false;
        }
        if let Some(since) = self.since {
            if record.start_time < since {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(phase: Phase, closed: bool) -> SessionRecord {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        SessionRecord {
            id: SessionId::new_v4(),
            user_id: "u".into(),
            start_time: start,
            end_time: closed.then(|| start + chrono::Duration::minutes(25)),
            phase,
            task_id: None,
        }
    }

    #[test]
    fn completed_focus_query_filters_phase_and_open_runs() {
        let q = SessionQuery::completed_focus();
        assert!(q.matches(&record(Phase::Focus, true)));
        assert!(!q.matches(&record(Phase::Focus, false)));
        assert!(!q.matches(&record(Phase::ShortRest, true)));
    }

    #[test]
    fn since_bound_is_inclusive() {
        let r = record(Phase::Focus, true);
        assert!(SessionQuery::default().since(r.start_time).matches(&r));
        assert!(!SessionQuery::default()
            .since(r.start_time + chrono::Duration::seconds(1))
            .matches(&r));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(SessionId::new_v4(), SessionId::new_v4());
    }
}
