//! Opens and closes session records on behalf of the timer.

use crate::error::Result;
use crate::identity::IdentityProvider;
use crate::storage::SessionStore;
use crate::task::TaskId;
use crate::timer::Phase;

use super::SessionId;

/// Writes session records for the current user.
///
/// Without an identity every operation is a no-op.
pub struct SessionRecorder<'a, S: SessionStore, I: IdentityProvider> {
    store: &'a S,
    identity: &'a I,
}

impl<'a, S: SessionStore, I: IdentityProvider> SessionRecorder<'a, S, I> {
    pub fn new(store: &'a S, identity: &'a I) -> Self {
        Self { store, identity }
    }

    /// Append an open record for `phase`.
    ///
    /// Returns `Ok(None)` when nobody is signed in.
    pub fn open_session(&self, phase: Phase, task_id: Option<&TaskId>) -> Result<Option<SessionId>> {
        let Some(user) = self.identity.current_identity() else {
            tracing::debug!(phase = phase.as_str(), "no identity, session not recorded");
            return Ok(None);
        };
        let record = self.store.append_session(&user, phase, task_id)?;
        tracing::debug!(
            session = %record.id,
            phase = phase.as_str(),
            task = ?task_id.map(TaskId::as_str),
            "session opened"
        );
        Ok(Some(record.id))
    }

    /// Set the end time of an open record.
    ///
    /// Missing or already closed records are left alone.
    pub fn close_session(&self, id: &SessionId) -> Result<()> {
        let Some(user) = self.identity.current_identity() else {
            tracing::warn!(session = %id, "no identity, session left open");
            return Ok(());
        };
        if self.store.close_session(&user, id)? {
            tracing::debug!(session = %id, "session closed");
        } else {
            tracing::warn!(session = %id, "no open session to close");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{StaticIdentity, UserRef};
    use crate::session::SessionQuery;
    use crate::storage::Database;

    fn ada() -> UserRef {
        UserRef::new("ada").unwrap()
    }

    #[test]
    fn open_and_close_for_signed_in_user() {
        let db = Database::open_memory().unwrap();
        let identity = StaticIdentity::signed_in(ada());
        let recorder = SessionRecorder::new(&db, &identity);

        let id = recorder.open_session(Phase::Focus, None).unwrap().unwrap();
        recorder.close_session(&id).unwrap();

        let records = db
            .query_sessions(&ada(), &SessionQuery::completed_focus())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
    }

    #[test]
    fn anonymous_user_records_nothing() {
        let db = Database::open_memory().unwrap();
        let identity = StaticIdentity::anonymous();
        let recorder = SessionRecorder::new(&db, &identity);

        assert!(recorder.open_session(Phase::Focus, None).unwrap().is_none());
        recorder.close_session(&SessionId::from("ghost")).unwrap();
    }

    #[test]
    fn closing_stale_session_is_a_noop() {
        let db = Database::open_memory().unwrap();
        let identity = StaticIdentity::signed_in(ada());
        let recorder = SessionRecorder::new(&db, &identity);

        let id = recorder.open_session(Phase::ShortRest, None).unwrap().unwrap();
        recorder.close_session(&id).unwrap();
        let first_end = db.query_sessions(&ada(), &SessionQuery::default()).unwrap()[0].end_time;

        recorder.close_session(&id).unwrap();
        recorder.close_session(&SessionId::from("missing")).unwrap();
        let records = db.query_sessions(&ada(), &SessionQuery::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].end_time, first_end);
    }

    #[test]
    fn open_session_links_task() {
        let db = Database::open_memory().unwrap();
        let identity = StaticIdentity::signed_in(ada());
        let recorder = SessionRecorder::new(&db, &identity);
        let task = crate::task::TaskId::from("t-1");

        recorder.open_session(Phase::Focus, Some(&task)).unwrap();
        let records = db.query_sessions(&ada(), &SessionQuery::default()).unwrap();
        assert_eq!(records[0].task_id, Some(task));
    }
}
