//! SQLite-based session and task storage.
//!
//! Provides persistent storage for:
//! - Session records (one per phase run, open until `end_time` is set)
//! - User tasks
//! - Key-value store for application state
//!
//! All timestamps are assigned here, at write time, and stored as RFC 3339
//! UTC strings with millisecond precision so they order lexically.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use super::feed::{LiveQueries, Snapshot};
use super::{data_dir, migrations, KvStore, SessionStore, TaskStore};
use crate::error::{DatabaseError, Result};
use crate::identity::UserRef;
use crate::session::{SessionId, SessionQuery, SessionRecord};
use crate::task::{normalize_title, Task, TaskId};
use crate::timer::Phase;

/// SQLite database for sessions, tasks and local state.
pub struct Database {
    conn: Connection,
    live_sessions: LiveQueries<SessionQuery, SessionRecord>,
    live_tasks: LiveQueries<(), Task>,
}

impl Database {
    /// Open the database at `<data dir>/pomofocus.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join("pomofocus.db"))
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            live_sessions: LiveQueries::new(),
            live_tasks: LiveQueries::new(),
        })
    }

    /// Insert an existing record verbatim, keeping its timestamps.
    ///
    /// Used to import history exported from another device. Records that
    /// already exist are left untouched; returns whether a row was added.
    pub fn import_session(&self, record: &SessionRecord) -> Result<bool> {
        let user = UserRef::new(record.user_id.clone()).ok_or_else(|| {
            crate::error::ValidationError::Empty("user_id".into())
        })?;
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO sessions (id, user_id, phase, task_id, start_time, end_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.as_str(),
                    user.as_str(),
                    record.phase.as_str(),
                    record.task_id.as_ref().map(TaskId::as_str),
                    format_ts(record.start_time),
                    record.end_time.map(format_ts),
                ],
            )
            .map_err(DatabaseError::from)?;
        if inserted > 0 {
            self.publish_sessions(&user);
        }
        Ok(inserted > 0)
    }

    /// Re-run every live query of `user`.
    ///
    /// Picks up rows written through another connection, e.g. by a second
    /// process sharing the database file.
    pub fn refresh(&self, user: &UserRef) {
        self.publish_sessions(user);
        self.publish_tasks(user);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn load_sessions(&self, user: &UserRef, query: &SessionQuery) -> Result<Vec<SessionRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, phase, task_id, start_time, end_time
                 FROM sessions
                 WHERE user_id = ?1
                   AND (?2 IS NULL OR phase = ?2)
                   AND (?3 = 0 OR end_time IS NOT NULL)
                   AND (?4 IS NULL OR start_time >= ?4)
                 ORDER BY start_time ASC, id ASC",
            )
            .map_err(DatabaseError::from)?;
        let rows = stmt
            .query_map(
                params![
                    user.as_str(),
                    query.phase.map(|p| p.as_str()),
                    query.closed_only,
                    query.since.map(format_ts),
                ],
                |row| {
                    Ok(RawSession {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        phase: row.get(2)?,
                        task_id: row.get(3)?,
                        start_time: row.get(4)?,
                        end_time: row.get(5)?,
                    })
                },
            )
            .map_err(DatabaseError::from)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(DatabaseError::from)?.decode()?);
        }
        Ok(records)
    }

    fn load_tasks(&self, user: &UserRef) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, completed, created_at
                 FROM tasks
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(DatabaseError::from)?;
        let rows = stmt
            .query_map(params![user.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(DatabaseError::from)?;

        let mut tasks = Vec::new();
        for row in rows {
            let (id, title, completed, created_at) = row.map_err(DatabaseError::from)?;
            tasks.push(Task {
                id: TaskId::from(id),
                title,
                completed,
                created_at: parse_ts("tasks", &created_at)?,
            });
        }
        Ok(tasks)
    }

    fn publish_sessions(&self, user: &UserRef) {
        self.live_sessions
            .publish(user, |query| self.load_sessions(user, query));
    }

    fn publish_tasks(&self, user: &UserRef) {
        self.live_tasks.publish(user, |_| self.load_tasks(user));
    }
}

impl SessionStore for Database {
    fn append_session(
        &self,
        user: &UserRef,
        phase: Phase,
        task_id: Option<&TaskId>,
    ) -> Result<SessionRecord> {
        let record = SessionRecord {
            id: SessionId::new_v4(),
            user_id: user.as_str().to_string(),
            start_time: now(),
            end_time: None,
            phase,
            task_id: task_id.cloned(),
        };
        self.conn
            .execute(
                "INSERT INTO sessions (id, user_id, phase, task_id, start_time, end_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
                params![
                    record.id.as_str(),
                    record.user_id,
                    phase.as_str(),
                    task_id.map(TaskId::as_str),
                    format_ts(record.start_time),
                ],
            )
            .map_err(DatabaseError::from)?;
        self.publish_sessions(user);
        Ok(record)
    }

    fn close_session(&self, user: &UserRef, id: &SessionId) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE sessions SET end_time = ?1
                 WHERE id = ?2 AND user_id = ?3 AND end_time IS NULL",
                params![format_ts(now()), id.as_str(), user.as_str()],
            )
            .map_err(DatabaseError::from)?;
        if updated > 0 {
            self.publish_sessions(user);
        }
        Ok(updated > 0)
    }

    fn query_sessions(&self, user: &UserRef, query: &SessionQuery) -> Result<Vec<SessionRecord>> {
        self.load_sessions(user, query)
    }

    fn watch_sessions(
        &self,
        user: &UserRef,
        query: SessionQuery,
    ) -> Result<watch::Receiver<Snapshot<SessionRecord>>> {
        let initial = self.load_sessions(user, &query)?;
        Ok(self.live_sessions.subscribe(user.clone(), query, initial))
    }
}

impl TaskStore for Database {
    fn create_task(&self, user: &UserRef, title: &str) -> Result<Task> {
        let task = Task {
            id: TaskId::new_v4(),
            title: normalize_title(title)?,
            completed: false,
            created_at: now(),
        };
        self.conn
            .execute(
                "INSERT INTO tasks (id, user_id, title, completed, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![
                    task.id.as_str(),
                    user.as_str(),
                    task.title,
                    format_ts(task.created_at),
                ],
            )
            .map_err(DatabaseError::from)?;
        self.publish_tasks(user);
        Ok(task)
    }

    fn get_task(&self, user: &UserRef, id: &TaskId) -> Result<Option<Task>> {
        let row = self
            .conn
            .query_row(
                "SELECT title, completed, created_at FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![id.as_str(), user.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(DatabaseError::from)?;
        match row {
            Some((title, completed, created_at)) => Ok(Some(Task {
                id: id.clone(),
                title,
                completed,
                created_at: parse_ts("tasks", &created_at)?,
            })),
            None => Ok(None),
        }
    }

    fn set_task_completed(&self, user: &UserRef, id: &TaskId, completed: bool) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE tasks SET completed = ?1 WHERE id = ?2 AND user_id = ?3",
                params![completed, id.as_str(), user.as_str()],
            )
            .map_err(DatabaseError::from)?;
        if updated > 0 {
            self.publish_tasks(user);
        }
        Ok(updated > 0)
    }

    fn delete_task(&self, user: &UserRef, id: &TaskId) -> Result<bool> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![id.as_str(), user.as_str()],
            )
            .map_err(DatabaseError::from)?;
        if deleted > 0 {
            self.publish_tasks(user);
        }
        Ok(deleted > 0)
    }

    fn list_tasks(&self, user: &UserRef) -> Result<Vec<Task>> {
        self.load_tasks(user)
    }

    fn count_completed_tasks(&self, user: &UserRef) -> Result<u64> {
        let count = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND completed = 1",
                params![user.as_str()],
                |row| row.get::<_, u64>(0),
            )
            .map_err(DatabaseError::from)?;
        Ok(count)
    }

    fn watch_tasks(&self, user: &UserRef) -> Result<watch::Receiver<Snapshot<Task>>> {
        let initial = self.load_tasks(user)?;
        Ok(self.live_tasks.subscribe(user.clone(), (), initial))
    }
}

impl KvStore for Database {
    fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(value)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(DatabaseError::from)?;
        Ok(())
    }
}

struct RawSession {
    id: String,
    user_id: String,
    phase: String,
    task_id: Option<String>,
    start_time: String,
    end_time: Option<String>,
}

impl RawSession {
    fn decode(self) -> Result<SessionRecord> {
        let phase = Phase::parse(&self.phase).ok_or_else(|| DatabaseError::CorruptRow {
            table: "sessions",
            message: format!("unknown phase '{}'", self.phase),
        })?;
        Ok(SessionRecord {
            id: SessionId::from(self.id),
            user_id: self.user_id,
            start_time: parse_ts("sessions", &self.start_time)?,
            end_time: self
                .end_time
                .as_deref()
                .map(|s| parse_ts("sessions", s))
                .transpose()?,
            phase,
            task_id: self.task_id.map(TaskId::from),
        })
    }
}

fn now() -> DateTime<Utc> {
    // Truncate to the stored precision so returned records equal stored ones.
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(table: &'static str, s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::CorruptRow {
                table,
                message: format!("bad timestamp '{s}': {e}"),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ada() -> UserRef {
        UserRef::new("ada").unwrap()
    }

    #[test]
    fn append_then_close_session() {
        let db = Database::open_memory().unwrap();
        let record = db.append_session(&ada(), Phase::Focus, None).unwrap();
        assert!(record.end_time.is_none());

        let open = db.query_sessions(&ada(), &SessionQuery::default()).unwrap();
        assert_eq!(open, vec![record.clone()]);

        assert!(db.close_session(&ada(), &record.id).unwrap());
        let closed = db
            .query_sessions(&ada(), &SessionQuery::completed_focus())
            .unwrap();
        assert_eq!(closed.len(), 1);
        assert!(closed[0].end_time.unwrap() >= closed[0].start_time);
    }

    #[test]
    fn closing_twice_or_unknown_is_reported() {
        let db = Database::open_memory().unwrap();
        let record = db.append_session(&ada(), Phase::ShortRest, None).unwrap();
        assert!(db.close_session(&ada(), &record.id).unwrap());
        assert!(!db.close_session(&ada(), &record.id).unwrap());
        assert!(!db
            .close_session(&ada(), &SessionId::from("missing"))
            .unwrap());
    }

    #[test]
    fn sessions_are_scoped_per_user() {
        let db = Database::open_memory().unwrap();
        let bob = UserRef::new("bob").unwrap();
        let record = db.append_session(&ada(), Phase::Focus, None).unwrap();
        assert!(!db.close_session(&bob, &record.id).unwrap());
        assert!(db
            .query_sessions(&bob, &SessionQuery::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn query_filters_by_phase_and_since() {
        let db = Database::open_memory().unwrap();
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        for (i, phase) in [Phase::Focus, Phase::ShortRest, Phase::Focus].iter().enumerate() {
            db.import_session(&SessionRecord {
                id: SessionId::from(format!("s{i}")),
                user_id: "ada".into(),
                start_time: base + chrono::Duration::days(i as i64),
                end_time: Some(base + chrono::Duration::days(i as i64) + chrono::Duration::minutes(25)),
                phase: *phase,
                task_id: None,
            })
            .unwrap();
        }

        let focus = db
            .query_sessions(&ada(), &SessionQuery::completed_focus())
            .unwrap();
        assert_eq!(focus.len(), 2);
        assert_eq!(focus[0].id.as_str(), "s0");

        let recent = db
            .query_sessions(
                &ada(),
                &SessionQuery::completed_focus().since(base + chrono::Duration::days(1)),
            )
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id.as_str(), "s2");

        let since_only = db
            .query_sessions(
                &ada(),
                &SessionQuery::default().since(base + chrono::Duration::days(1)),
            )
            .unwrap();
        assert_eq!(since_only.len(), 2);
    }

    #[test]
    fn import_is_idempotent() {
        let db = Database::open_memory().unwrap();
        let record = db.append_session(&ada(), Phase::Focus, None).unwrap();
        assert!(!db.import_session(&record).unwrap());
    }

    #[test]
    fn session_keeps_task_link() {
        let db = Database::open_memory().unwrap();
        let task = db.create_task(&ada(), "Write report").unwrap();
        let record = db
            .append_session(&ada(), Phase::Focus, Some(&task.id))
            .unwrap();
        let stored = db.query_sessions(&ada(), &SessionQuery::default()).unwrap();
        assert_eq!(stored[0].task_id, Some(task.id));
        assert_eq!(stored[0].id, record.id);
    }

    #[test]
    fn watch_sessions_pushes_new_snapshots() {
        let db = Database::open_memory().unwrap();
        let mut rx = db
            .watch_sessions(&ada(), SessionQuery::completed_focus())
            .unwrap();
        assert!(rx.borrow_and_update().is_empty());

        let record = db.append_session(&ada(), Phase::Focus, None).unwrap();
        // Open records do not match the query but still trigger a refresh.
        assert!(rx.borrow_and_update().is_empty());

        db.close_session(&ada(), &record.id).unwrap();
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, record.id);
    }

    #[test]
    fn task_lifecycle() {
        let db = Database::open_memory().unwrap();
        let first = db.create_task(&ada(), "  first ").unwrap();
        let second = db.create_task(&ada(), "second").unwrap();
        assert_eq!(first.title, "first");

        let listed = db.list_tasks(&ada()).unwrap();
        assert_eq!(listed[0].id, second.id, "newest first");

        let toggled = db.toggle_task(&ada(), &first.id).unwrap().unwrap();
        assert!(toggled.completed);
        assert_eq!(db.count_completed_tasks(&ada()).unwrap(), 1);

        let toggled = db.toggle_task(&ada(), &first.id).unwrap().unwrap();
        assert!(!toggled.completed);

        assert!(db.delete_task(&ada(), &first.id).unwrap());
        assert!(!db.delete_task(&ada(), &first.id).unwrap());
        assert!(db.toggle_task(&ada(), &first.id).unwrap().is_none());
        assert_eq!(db.list_tasks(&ada()).unwrap().len(), 1);
    }

    #[test]
    fn blank_task_title_is_rejected() {
        let db = Database::open_memory().unwrap();
        assert!(db.create_task(&ada(), "   ").is_err());
        assert!(db.list_tasks(&ada()).unwrap().is_empty());
    }

    #[test]
    fn watch_tasks_follows_changes() {
        let db = Database::open_memory().unwrap();
        let mut rx = db.watch_tasks(&ada()).unwrap();
        let task = db.create_task(&ada(), "read").unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
        db.delete_task(&ada(), &task.id).unwrap();
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn refresh_sees_writes_from_another_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pomofocus.db");
        let reader = Database::open_at(&path).unwrap();
        let writer = Database::open_at(&path).unwrap();
        let mut rx = reader.watch_tasks(&ada()).unwrap();

        writer.create_task(&ada(), "from elsewhere").unwrap();
        assert!(!rx.has_changed().unwrap());

        reader.refresh(&ada());
        assert_eq!(rx.borrow_and_update()[0].title, "from elsewhere");
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn on_disk_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pomofocus.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.create_task(&ada(), "persisted").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.list_tasks(&ada()).unwrap()[0].title, "persisted");
    }
}
