//! Focus statistics.
//!
//! Everything here is a pure function of a session snapshot, the current
//! local date, a time zone and the statistics options. Only closed focus
//! records count.

mod heatmap;
mod summary;

pub use heatmap::{
    render_grid, DailyBuckets, DayCount, IntensityScale, LEVEL_GLYPHS, MAX_WINDOW_DAYS,
};
pub use summary::{current_streak, local_date, Summary};

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use crate::error::Result;
use crate::session::SessionRecord;
use crate::storage::Config;

/// Inputs of the aggregate calculator that come from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsOptions {
    pub focus_secs: u64,
    pub window_days: u32,
    pub scale: IntensityScale,
}

impl StatsOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            focus_secs: config.schedule.focus_duration_secs,
            window_days: config.stats.heatmap_days,
            scale: config.intensity_scale()?,
        })
    }
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            focus_secs: crate::timer::PhaseDurations::DEFAULT_FOCUS_SECS,
            window_days: 90,
            scale: IntensityScale::default(),
        }
    }
}

/// Summary plus the per-day activity of the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub today: NaiveDate,
    pub summary: Summary,
    pub days: Vec<DayCount>,
}

impl StatsReport {
    pub fn compute<Tz: TimeZone>(
        records: &[SessionRecord],
        tasks_completed: u64,
        today: NaiveDate,
        tz: &Tz,
        options: &StatsOptions,
    ) -> Self {
        let summary = Summary::compute(records, tasks_completed, options.focus_secs, today, tz);
        let buckets = DailyBuckets::compute(records, today, options.window_days, tz);
        Self {
            today,
            summary,
            days: buckets.days(&options.scale),
        }
    }
}
