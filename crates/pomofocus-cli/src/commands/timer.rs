use std::time::Duration;

use clap::Subcommand;
use pomofocus_core::storage::{Database, SessionStore, Snapshot, TaskStore};
use pomofocus_core::{
    Config, Event, FocusTimer, IdentityProvider, MusicTransport, NotificationQueue,
    NotificationSink, Phase, Playlist, SessionQuery, SessionRecord, SessionRecorder,
    StoredIdentity, TaskId, TimerEngine, TracingSink, UserRef,
};
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio::sync::watch;
use tokio::time::Interval;

use super::{print_json, selected_task, set_selected_task, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the timer, reading commands from stdin
    ///
    /// Commands: p (start/pause), s (skip), f/b/l (focus, short break,
    /// long break), m (music play/pause), n/N (next/previous track),
    /// v <0-100> (volume), ? (status), q (quit).
    Run {
        /// Attribute focus sessions to this task instead of the selected one
        #[arg(long)]
        task: Option<String>,
        /// Start the countdown immediately
        #[arg(long)]
        start: bool,
        /// Stop after N completed phases, starting each next phase automatically
        #[arg(long)]
        cycles: Option<u32>,
        /// Length of one timer second in milliseconds
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },
    /// Print the state of a fresh timer as JSON
    Status,
}

struct RunOptions {
    task: Option<String>,
    start: bool,
    cycles: Option<u32>,
    tick_ms: u64,
}

#[derive(Debug, PartialEq)]
enum Command {
    Toggle,
    Skip,
    Select(Phase),
    MusicToggle,
    NextTrack,
    PreviousTrack,
    Volume(i32),
    Status,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let command = match parts.next()? {
        "p" => Command::Toggle,
        "s" => Command::Skip,
        "f" => Command::Select(Phase::Focus),
        "b" => Command::Select(Phase::ShortRest),
        "l" => Command::Select(Phase::LongRest),
        "m" => Command::MusicToggle,
        "n" => Command::NextTrack,
        "N" => Command::PreviousTrack,
        "v" => Command::Volume(parts.next()?.parse().ok()?),
        "?" => Command::Status,
        "q" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

pub fn run(action: TimerAction) -> CliResult {
    let config = Config::load()?;

    match action {
        TimerAction::Run {
            task,
            start,
            cycles,
            tick_ms,
        } => {
            if cycles == Some(0) {
                return Err("--cycles must be greater than zero".into());
            }
            let db = Database::open()?;
            let options = RunOptions {
                task,
                start,
                cycles,
                tick_ms,
            };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            runtime.block_on(run_loop(&db, &config, options))?;
        }
        TimerAction::Status => {
            let durations = config.durations()?;
            let engine = TimerEngine::new(durations);
            print_json(&json!({
                "snapshot": engine.snapshot(),
                "durations": durations,
            }))?;
        }
    }
    Ok(())
}

/// Task new focus sessions are linked to: `--task`, else the stored selection.
fn resolve_task(db: &Database, user: Option<&UserRef>, arg: Option<String>) -> CliResult<Option<TaskId>> {
    let Some(user) = user else {
        return Ok(None);
    };
    if let Some(id) = arg {
        let id = TaskId::from(id);
        if db.get_task(user, &id)?.is_none() {
            return Err(format!("task not found: {id}").into());
        }
        return Ok(Some(id));
    }
    match selected_task(db)? {
        Some(id) if db.get_task(user, &id)?.is_some() => Ok(Some(id)),
        Some(stale) => {
            tracing::debug!(task = %stale, "selected task no longer exists");
            set_selected_task(db, None)?;
            Ok(None)
        }
        None => Ok(None),
    }
}

async fn run_loop(db: &Database, config: &Config, options: RunOptions) -> CliResult {
    let identity = StoredIdentity::new(db);
    let user = identity.current_identity();
    if user.is_none() {
        tracing::warn!("not signed in, sessions will not be recorded");
    }
    let task = resolve_task(db, user.as_ref(), options.task)?;

    let queue = NotificationQueue::new(config.notifications.queue_limit)
        .with_default_duration(Duration::from_millis(config.notifications.duration_ms));
    let mut timer = FocusTimer::new(
        TimerEngine::new(config.durations()?),
        SessionRecorder::new(db, &identity),
        queue,
    );
    timer.set_active_task(task);
    let mut playlist = Playlist::from_config(&config.music);
    let mut focus_feed = match &user {
        Some(user) => Some(db.watch_sessions(user, SessionQuery::completed_focus())?),
        None => None,
    };
    if let Some(feed) = focus_feed.as_mut() {
        feed.borrow_and_update();
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(options.tick_ms.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    emit(Some(timer.snapshot()))?;
    if options.start {
        toggle(&mut timer, &mut ticker)?;
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut completed_phases = 0u32;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(event) = timer.tick() else { continue };
                let is_completion = matches!(event, Event::PhaseCompleted { .. });
                emit(Some(event))?;
                if is_completion {
                    completed_phases += 1;
                    if let Some(limit) = options.cycles {
                        if completed_phases >= limit {
                            break;
                        }
                        toggle(&mut timer, &mut ticker)?;
                    }
                }
            }
            line = lines.next_line(), if stdin_open => match line? {
                None => {
                    stdin_open = false;
                    if options.cycles.is_none() || !timer.engine().is_running() {
                        break;
                    }
                }
                Some(line) => match parse_command(&line) {
                    Some(Command::Quit) => break,
                    Some(command) => apply(command, &mut timer, &mut ticker, &mut playlist)?,
                    None if line.trim().is_empty() => {}
                    None => eprintln!("unknown command: {}", line.trim()),
                },
            },
            alive = next_change(&mut focus_feed) => {
                if !alive {
                    focus_feed = None;
                } else if let Some(feed) = focus_feed.as_mut() {
                    let total = feed.borrow_and_update().len();
                    println!("{}", json!({ "type": "focus_total", "completed_focus": total }));
                }
            }
        }
        flush_notifications(timer.notifications_mut(), config.notifications.enabled)?;
    }

    flush_notifications(timer.notifications_mut(), config.notifications.enabled)?;
    if timer.engine().open_session().is_some() {
        tracing::info!("quitting with the current phase unfinished; its session stays open");
    }
    Ok(())
}

/// Start or pause. Each start restarts the ticker so the first second is a
/// full `tick_ms` away.
fn toggle<S, I>(
    timer: &mut FocusTimer<'_, S, I, NotificationQueue>,
    ticker: &mut Interval,
) -> CliResult
where
    S: SessionStore,
    I: IdentityProvider,
{
    let event = timer.toggle();
    if matches!(event, Some(Event::TimerStarted { .. })) {
        ticker.reset();
    }
    emit(event)
}

fn apply<S, I>(
    command: Command,
    timer: &mut FocusTimer<'_, S, I, NotificationQueue>,
    ticker: &mut Interval,
    playlist: &mut Playlist,
) -> CliResult
where
    S: SessionStore,
    I: IdentityProvider,
{
    match command {
        Command::Toggle => toggle(timer, ticker)?,
        Command::Skip => emit(timer.skip())?,
        Command::Select(phase) => emit(timer.select_phase(phase))?,
        Command::Status => emit(Some(timer.snapshot()))?,
        Command::MusicToggle => {
            playlist.toggle();
            print_music(playlist);
        }
        Command::NextTrack => {
            playlist.next();
            print_music(playlist);
        }
        Command::PreviousTrack => {
            playlist.previous();
            print_music(playlist);
        }
        Command::Volume(volume) => {
            playlist.set_volume(volume);
            print_music(playlist);
        }
        Command::Quit => {}
    }
    Ok(())
}

async fn next_change(feed: &mut Option<watch::Receiver<Snapshot<SessionRecord>>>) -> bool {
    match feed {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}

fn emit(event: Option<Event>) -> CliResult {
    if let Some(event) = event {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

fn print_music(playlist: &Playlist) {
    println!(
        "{}",
        json!({
            "type": "music",
            "playing": playlist.is_playing(),
            "volume": playlist.volume(),
            "track": playlist.current_track(),
        })
    );
}

fn flush_notifications(queue: &mut NotificationQueue, enabled: bool) -> CliResult {
    for notification in queue.drain() {
        if enabled {
            println!(
                "{}",
                serde_json::to_string(&json!({ "type": "notification", "notification": notification }))?
            );
        } else {
            TracingSink.notify(notification);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stdin_commands() {
        assert_eq!(parse_command("p"), Some(Command::Toggle));
        assert_eq!(parse_command(" s "), Some(Command::Skip));
        assert_eq!(parse_command("b"), Some(Command::Select(Phase::ShortRest)));
        assert_eq!(parse_command("N"), Some(Command::PreviousTrack));
        assert_eq!(parse_command("v 40"), Some(Command::Volume(40)));
        assert_eq!(parse_command("q"), Some(Command::Quit));
    }

    #[test]
    fn rejects_unknown_or_incomplete_commands() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("x"), None);
        assert_eq!(parse_command("v"), None);
        assert_eq!(parse_command("v loud"), None);
    }
}
