use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::session::SessionRecord;

/// Calendar date of `ts` in `tz`.
pub fn local_date<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Consecutive days with at least one completed focus run, counted back
/// from `today`. Zero when nothing was completed today.
pub fn current_streak<Tz: TimeZone>(records: &[SessionRecord], today: NaiveDate, tz: &Tz) -> u32 {
    let days: HashSet<NaiveDate> = records
        .iter()
        .filter(|r| r.is_completed_focus())
        .map(|r| local_date(r.start_time, tz))
        .collect();

    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Headline numbers of the statistics view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_count: u64,
    pub total_focus_secs: u64,
    pub current_streak: u32,
    pub tasks_completed: u64,
}

impl Summary {
    /// Focus time is credited at the nominal focus length per completed run.
    pub fn compute<Tz: TimeZone>(
        records: &[SessionRecord],
        tasks_completed: u64,
        focus_secs: u64,
        today: NaiveDate,
        tz: &Tz,
    ) -> Self {
        let total_count = records.iter().filter(|r| r.is_completed_focus()).count() as u64;
        Self {
            total_count,
            total_focus_secs: total_count.saturating_mul(focus_secs),
            current_streak: current_streak(records, today, tz),
            tasks_completed,
        }
    }

    /// Total focus time in hours, rounded to one decimal.
    pub fn focus_hours(&self) -> f64 {
        (self.total_focus_secs as f64 / 360.0).round() / 10.0
    }
}
