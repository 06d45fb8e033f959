mod engine;
mod focus;
mod phase;

pub use engine::{TimerEngine, TimerState};
pub use focus::FocusTimer;
pub use phase::{format_mmss, Phase, PhaseDurations};
