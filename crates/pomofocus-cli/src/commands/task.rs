//! Task management commands for CLI.

use clap::Subcommand;
use pomofocus_core::storage::{Database, TaskStore};
use pomofocus_core::TaskId;
use serde_json::json;

use super::{print_json, selected_task, set_selected_task, signed_in_user, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
    },
    /// List tasks, newest first
    List,
    /// Flip the completed flag of a task
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Attribute new focus sessions to a task
    Select {
        /// Task ID
        id: String,
    },
    /// Clear the selected task
    Clear,
}

pub fn run(action: TaskAction) -> CliResult {
    let db = Database::open()?;
    let user = signed_in_user(&db)?;

    match action {
        TaskAction::Add { title } => {
            let task = db.create_task(&user, &title)?;
            print_json(&task)?;
        }
        TaskAction::List => {
            let selected = selected_task(&db)?;
            let tasks: Vec<_> = db
                .list_tasks(&user)?
                .into_iter()
                .map(|task| {
                    let is_selected = selected.as_ref() == Some(&task.id);
                    json!({
                        "id": task.id,
                        "title": task.title,
                        "completed": task.completed,
                        "created_at": task.created_at,
                        "selected": is_selected,
                    })
                })
                .collect();
            print_json(&tasks)?;
        }
        TaskAction::Toggle { id } => {
            let id = TaskId::from(id);
            match db.toggle_task(&user, &id)? {
                Some(task) => print_json(&task)?,
                None => return Err(format!("task not found: {id}").into()),
            }
        }
        TaskAction::Delete { id } => {
            let id = TaskId::from(id);
            if !db.delete_task(&user, &id)? {
                return Err(format!("task not found: {id}").into());
            }
            if selected_task(&db)?.as_ref() == Some(&id) {
                set_selected_task(&db, None)?;
            }
            println!("Task deleted: {id}");
        }
        TaskAction::Select { id } => {
            let id = TaskId::from(id);
            let task = db
                .get_task(&user, &id)?
                .ok_or_else(|| format!("task not found: {id}"))?;
            set_selected_task(&db, Some(&task.id))?;
            println!("Selected: {}", task.title);
        }
        TaskAction::Clear => {
            set_selected_task(&db, None)?;
            println!("Selection cleared");
        }
    }
    Ok(())
}
