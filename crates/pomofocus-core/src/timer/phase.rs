use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The activity the timer is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Focus,
    ShortRest,
    LongRest,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Focus, Phase::ShortRest, Phase::LongRest];

    /// Storage key used in the `sessions.phase` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Focus => "focus",
            Phase::ShortRest => "short_rest",
            Phase::LongRest => "long_rest",
        }
    }

    pub fn parse(s: &str) -> Option<Phase> {
        match s {
            "focus" => Some(Phase::Focus),
            "short_rest" => Some(Phase::ShortRest),
            "long_rest" => Some(Phase::LongRest),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Focus => "Focus",
            Phase::ShortRest => "Short Break",
            Phase::LongRest => "Long Break",
        }
    }

    pub fn is_rest(&self) -> bool {
        !matches!(self, Phase::Focus)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Nominal length of each phase plus the long-rest cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub focus_secs: u64,
    pub short_rest_secs: u64,
    pub long_rest_secs: u64,
    /// Every n-th completed focus phase is followed by a long rest.
    pub long_break_every: u32,
}

impl PhaseDurations {
    pub const DEFAULT_FOCUS_SECS: u64 = 25 * 60;
    pub const DEFAULT_SHORT_REST_SECS: u64 = 5 * 60;
    pub const DEFAULT_LONG_REST_SECS: u64 = 15 * 60;
    pub const DEFAULT_LONG_BREAK_EVERY: u32 = 4;

    /// Build a validated set of durations.
    ///
    /// # Errors
    /// Returns an error if any duration or the long-break cadence is zero.
    pub fn new(
        focus_secs: u64,
        short_rest_secs: u64,
        long_rest_secs: u64,
        long_break_every: u32,
    ) -> Result<Self, ValidationError> {
        let durations = Self {
            focus_secs,
            short_rest_secs,
            long_rest_secs,
            long_break_every,
        };
        durations.validate()?;
        Ok(durations)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("focus_secs", self.focus_secs),
            ("short_rest_secs", self.short_rest_secs),
            ("long_rest_secs", self.long_rest_secs),
            ("long_break_every", u64::from(self.long_break_every)),
        ] {
            if value == 0 {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }

    pub fn nominal(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Focus => self.focus_secs,
            Phase::ShortRest => self.short_rest_secs,
            Phase::LongRest => self.long_rest_secs,
        }
    }

    /// Phase that follows `phase` once `completed_focus` focus runs are done.
    ///
    /// For a focus phase `completed_focus` must already include the run
    /// that is ending.
    pub fn next_phase(&self, phase: Phase, completed_focus: u32) -> Phase {
        match phase {
            Phase::Focus => {
                if completed_focus % self.long_break_every.max(1) == 0 {
                    Phase::LongRest
                } else {
                    Phase::ShortRest
                }
            }
            Phase::ShortRest | Phase::LongRest => Phase::Focus,
        }
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            focus_secs: Self::DEFAULT_FOCUS_SECS,
            short_rest_secs: Self::DEFAULT_SHORT_REST_SECS,
            long_rest_secs: Self::DEFAULT_LONG_REST_SECS,
            long_break_every: Self::DEFAULT_LONG_BREAK_EVERY,
        }
    }
}

/// Zero-padded `MM:SS`. Minutes are not wrapped into hours.
pub fn format_mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
