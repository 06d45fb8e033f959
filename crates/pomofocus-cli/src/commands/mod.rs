pub mod auth;
pub mod config;
pub mod music;
pub mod session;
pub mod stats;
pub mod task;
pub mod timer;

use std::error::Error;

use pomofocus_core::storage::{Database, KvStore};
use pomofocus_core::{IdentityProvider, StoredIdentity, TaskId, UserRef};

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// Key of the task new focus sessions are attributed to.
const SELECTED_TASK_KEY: &str = "task.selected";

fn signed_in_user(db: &Database) -> CliResult<UserRef> {
    StoredIdentity::new(db)
        .current_identity()
        .ok_or_else(|| "not signed in (run `pomofocus-cli auth login <user>`)".into())
}

fn selected_task(db: &Database) -> CliResult<Option<TaskId>> {
    Ok(db.kv_get(SELECTED_TASK_KEY)?.map(TaskId::from))
}

fn set_selected_task(db: &Database, task: Option<&TaskId>) -> CliResult {
    match task {
        Some(id) => db.kv_set(SELECTED_TASK_KEY, id.as_str())?,
        None => db.kv_delete(SELECTED_TASK_KEY)?,
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
