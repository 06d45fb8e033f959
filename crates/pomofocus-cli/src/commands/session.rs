use chrono::{Duration, Utc};
use clap::Subcommand;
use pomofocus_core::storage::{Database, SessionStore};
use pomofocus_core::SessionQuery;

use super::{print_json, signed_in_user, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// List recorded sessions, oldest first
    List {
        /// Only sessions started in the last N days
        #[arg(long)]
        days: Option<u32>,
    },
}

pub fn run(action: SessionAction) -> CliResult {
    let db = Database::open()?;
    let user = signed_in_user(&db)?;

    match action {
        SessionAction::List { days } => {
            let mut query = SessionQuery::default();
            if let Some(days) = days {
                let since = Utc::now()
                    .checked_sub_signed(Duration::days(i64::from(days)))
                    .ok_or_else(|| format!("--days out of range: {days}"))?;
                query = query.since(since);
            }
            let sessions = db.query_sessions(&user, &query)?;
            print_json(&sessions)?;
        }
    }
    Ok(())
}
