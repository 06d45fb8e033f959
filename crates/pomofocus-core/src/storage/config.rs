//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Phase durations and the long-break cadence
//! - Notification preferences
//! - Statistics window and heatmap thresholds
//! - The music catalog
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
use crate::music::Track;
use crate::stats::{IntensityScale, MAX_WINDOW_DAYS};
use crate::timer::PhaseDurations;

/// Schedule-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_focus_duration")]
    pub focus_duration_secs: u64,
    #[serde(default = "default_short_break")]
    pub short_break_secs: u64,
    #[serde(default = "default_long_break")]
    pub long_break_secs: u64,
    #[serde(default = "default_pomodoros_before_long_break")]
    pub pomodoros_before_long_break: u32,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How long a notification stays visible.
    #[serde(default = "default_notification_ms")]
    pub duration_ms: u64,
    /// Maximum number of notifications kept at once.
    #[serde(default = "default_queue_limit")]
    pub queue_limit: usize,
}

/// Statistics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Trailing window of the activity heatmap, in days.
    #[serde(default = "default_heatmap_days")]
    pub heatmap_days: u32,
    /// Lower bounds of heatmap levels 1..=N.
    #[serde(default = "default_intensity_thresholds")]
    pub intensity_thresholds: Vec<u32>,
}

/// Music configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicConfig {
    #[serde(default = "default_volume")]
    pub default_volume: u8,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub music: MusicConfig,
}

fn default_focus_duration() -> u64 {
    PhaseDurations::DEFAULT_FOCUS_SECS
}
fn default_short_break() -> u64 {
    PhaseDurations::DEFAULT_SHORT_REST_SECS
}
fn default_long_break() -> u64 {
    PhaseDurations::DEFAULT_LONG_REST_SECS
}
fn default_pomodoros_before_long_break() -> u32 {
    PhaseDurations::DEFAULT_LONG_BREAK_EVERY
}
fn default_true() -> bool {
    true
}
fn default_notification_ms() -> u64 {
    5000
}
fn default_queue_limit() -> usize {
    3
}
fn default_heatmap_days() -> u32 {
    90
}
fn default_intensity_thresholds() -> Vec<u32> {
    IntensityScale::default().thresholds().to_vec()
}
fn default_volume() -> u8 {
    80
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            focus_duration_secs: default_focus_duration(),
            short_break_secs: default_short_break(),
            long_break_secs: default_long_break(),
            pomodoros_before_long_break: default_pomodoros_before_long_break(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: default_notification_ms(),
            queue_limit: default_queue_limit(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            heatmap_days: default_heatmap_days(),
            intensity_thresholds: default_intensity_thresholds(),
        }
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            tracks: Vec::new(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(root: &mut serde_json::Value, key: &str, value: &str) -> Result<()> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown().into());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown().into())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing the default config on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// The whole configuration is validated; on error `self` is unchanged.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value is invalid,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)?;
        self.save()
    }

    pub fn validate(&self) -> Result<()> {
        self.durations()?;
        self.intensity_scale()?;
        if !(1..=MAX_WINDOW_DAYS).contains(&self.stats.heatmap_days) {
            return Err(ConfigError::InvalidValue {
                key: "stats.heatmap_days".into(),
                message: format!("must be between 1 and {MAX_WINDOW_DAYS}"),
            }
            .into());
        }
        if self.music.default_volume > 100 {
            return Err(ConfigError::InvalidValue {
                key: "music.default_volume".into(),
                message: "must be between 0 and 100".into(),
            }
            .into());
        }
        Ok(())
    }

    pub fn durations(&self) -> Result<PhaseDurations> {
        PhaseDurations::new(
            self.schedule.focus_duration_secs,
            self.schedule.short_break_secs,
            self.schedule.long_break_secs,
            self.schedule.pomodoros_before_long_break,
        )
        .map_err(CoreError::from)
    }

    pub fn intensity_scale(&self) -> Result<IntensityScale> {
        IntensityScale::new(self.stats.intensity_thresholds.clone()).map_err(CoreError::from)
    }
}
