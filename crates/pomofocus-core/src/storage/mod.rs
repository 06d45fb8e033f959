mod config;
pub mod database;
mod feed;
pub mod migrations;

pub use config::{Config, MusicConfig, NotificationsConfig, ScheduleConfig, StatsConfig};
pub use database::Database;
pub use feed::Snapshot;

use std::path::PathBuf;

use tokio::sync::watch;

use crate::error::{ConfigError, Result};
use crate::identity::UserRef;
use crate::session::{SessionId, SessionQuery, SessionRecord};
use crate::task::{Task, TaskId};
use crate::timer::Phase;

/// Durable per-user session records.
///
/// Implementations assign `start_time` and `end_time` themselves so client
/// clocks never leak into the records.
pub trait SessionStore {
    /// Append an open record for `phase`.
    fn append_session(
        &self,
        user: &UserRef,
        phase: Phase,
        task_id: Option<&TaskId>,
    ) -> Result<SessionRecord>;

    /// Set `end_time` on an open record.
    ///
    /// Returns `false` if no open record with that id exists for the user.
    fn close_session(&self, user: &UserRef, id: &SessionId) -> Result<bool>;

    fn query_sessions(&self, user: &UserRef, query: &SessionQuery) -> Result<Vec<SessionRecord>>;

    /// Live query: the receiver always holds the latest result of `query`.
    fn watch_sessions(
        &self,
        user: &UserRef,
        query: SessionQuery,
    ) -> Result<watch::Receiver<Snapshot<SessionRecord>>>;
}

/// Durable per-user tasks, listed newest first.
pub trait TaskStore {
    fn create_task(&self, user: &UserRef, title: &str) -> Result<Task>;

    fn get_task(&self, user: &UserRef, id: &TaskId) -> Result<Option<Task>>;

    /// Returns `false` if the task does not exist.
    fn set_task_completed(&self, user: &UserRef, id: &TaskId, completed: bool) -> Result<bool>;

    /// Flip the completed flag, returning the updated task.
    fn toggle_task(&self, user: &UserRef, id: &TaskId) -> Result<Option<Task>> {
        let Some(task) = self.get_task(user, id)? else {
            return Ok(None);
        };
        self.set_task_completed(user, id, !task.completed)?;
        self.get_task(user, id)
    }

    /// Returns `false` if the task does not exist.
    fn delete_task(&self, user: &UserRef, id: &TaskId) -> Result<bool>;

    fn list_tasks(&self, user: &UserRef) -> Result<Vec<Task>>;

    fn count_completed_tasks(&self, user: &UserRef) -> Result<u64> {
        Ok(self
            .list_tasks(user)?
            .iter()
            .filter(|t| t.completed)
            .count() as u64)
    }

    fn watch_tasks(&self, user: &UserRef) -> Result<watch::Receiver<Snapshot<Task>>>;
}

/// Small key-value table for local application state.
pub trait KvStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>>;
    fn kv_set(&self, key: &str, value: &str) -> Result<()>;
    fn kv_delete(&self, key: &str) -> Result<()>;
}

/// Returns the data directory, creating it if needed.
///
/// `POMOFOCUS_HOME` overrides the location. Otherwise this is
/// `~/.config/pomofocus[-dev]/` based on `POMOFOCUS_ENV`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("POMOFOCUS_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("POMOFOCUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomofocus-dev")
            } else {
                base_dir.join("pomofocus")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
