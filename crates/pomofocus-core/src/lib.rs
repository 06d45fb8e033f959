//! # Pomofocus Core Library
//!
//! Core logic of the Pomofocus focus timer. The CLI binary is a thin layer
//! over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: A tick-driven phase state machine (`focus`, short and long
//!   rests) plus a driver that records sessions and raises notifications
//! - **Storage**: SQLite-backed sessions, tasks and live queries, and
//!   TOML-based configuration
//! - **Stats**: Streaks, totals and the activity heatmap, computed from
//!   session snapshots
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`FocusTimer`]: Engine plus session recording and notifications
//! - [`Database`]: Session and task persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod identity;
pub mod music;
pub mod notify;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use identity::{IdentityProvider, StaticIdentity, StoredIdentity, UserRef};
pub use music::{MusicTransport, Playlist, Track};
pub use notify::{Notification, NotificationQueue, NotificationSink, Severity, TracingSink};
pub use session::{SessionId, SessionQuery, SessionRecord, SessionRecorder};
pub use stats::{DailyBuckets, IntensityScale, StatsOptions, StatsReport, Summary};
pub use storage::{Config, Database, KvStore, SessionStore, Snapshot, TaskStore};
pub use task::{Task, TaskId};
pub use timer::{FocusTimer, Phase, PhaseDurations, TimerEngine, TimerState};
