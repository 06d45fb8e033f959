use std::time::Duration;

use chrono::Local;
use clap::Subcommand;
use pomofocus_core::stats::{
    render_grid, DailyBuckets, StatsOptions, StatsReport, MAX_WINDOW_DAYS,
};
use pomofocus_core::storage::{Database, SessionStore, TaskStore};
use pomofocus_core::{Config, SessionQuery, UserRef};
use tokio::io::AsyncBufReadExt;

use super::{print_json, signed_in_user, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals and current streak
    Summary,
    /// Activity heatmap of the trailing window
    Heatmap {
        /// Window length in days (defaults to stats.heatmap_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Summary and daily counts as JSON
    Json,
    /// Print the summary whenever it changes (q or end of input to stop)
    Watch {
        /// Polling interval in milliseconds
        #[arg(long, default_value = "2000")]
        interval_ms: u64,
    },
}

pub fn run(action: StatsAction) -> CliResult {
    let db = Database::open()?;
    let user = signed_in_user(&db)?;
    let config = Config::load()?;
    let mut options = StatsOptions::from_config(&config)?;

    match action {
        StatsAction::Summary => {
            let report = report(&db, &user, &options)?;
            let s = &report.summary;
            println!("Total pomodoros: {}", s.total_count);
            println!("Focus time:      {:.1} h", s.focus_hours());
            println!("Current streak:  {} day(s)", s.current_streak);
            println!("Tasks completed: {}", s.tasks_completed);
        }
        StatsAction::Heatmap { days } => {
            if let Some(days) = days {
                if !(1..=MAX_WINDOW_DAYS).contains(&days) {
                    return Err(format!("--days must be between 1 and {MAX_WINDOW_DAYS}").into());
                }
                options.window_days = days;
            }
            let records = db.query_sessions(&user, &SessionQuery::completed_focus())?;
            let today = Local::now().date_naive();
            let buckets = DailyBuckets::compute(&records, today, options.window_days, &Local);
            print!("{}", render_grid(&buckets, &options.scale));
        }
        StatsAction::Json => {
            print_json(&report(&db, &user, &options)?)?;
        }
        StatsAction::Watch { interval_ms } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            runtime.block_on(watch(&db, &user, &options, interval_ms))?;
        }
    }
    Ok(())
}

fn report(db: &Database, user: &UserRef, options: &StatsOptions) -> CliResult<StatsReport> {
    let records = db.query_sessions(user, &SessionQuery::completed_focus())?;
    Ok(StatsReport::compute(
        &records,
        db.count_completed_tasks(user)?,
        Local::now().date_naive(),
        &Local,
        options,
    ))
}

async fn watch(db: &Database, user: &UserRef, options: &StatsOptions, interval_ms: u64) -> CliResult {
    let mut sessions = db.watch_sessions(user, SessionQuery::completed_focus())?;
    let mut tasks = db.watch_tasks(user)?;
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut last = None;

    loop {
        let summary = {
            let records = sessions.borrow_and_update().clone();
            let completed = tasks.borrow_and_update().iter().filter(|t| t.completed).count();
            StatsReport::compute(
                &records,
                completed as u64,
                Local::now().date_naive(),
                &Local,
                options,
            )
            .summary
        };
        if last.as_ref() != Some(&summary) {
            println!("{}", serde_json::to_string(&summary)?);
            last = Some(summary);
        }

        tokio::select! {
            _ = ticker.tick() => db.refresh(user),
            Ok(()) = sessions.changed() => {}
            Ok(()) = tasks.changed() => {}
            line = lines.next_line() => match line? {
                Some(cmd) if cmd.trim() != "q" => {}
                _ => break,
            },
        }
    }
    Ok(())
}
