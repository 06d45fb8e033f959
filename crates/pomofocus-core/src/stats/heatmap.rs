//! Daily activity buckets and the terminal heatmap.

use chrono::{Datelike, NaiveDate, TimeZone};
use serde::Serialize;

use super::summary::local_date;
use crate::error::ValidationError;
use crate::session::SessionRecord;

/// Glyph per intensity level, from empty to the hottest level.
pub const LEVEL_GLYPHS: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Longest heatmap window, about ten years.
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// Step function from a daily count to an intensity level.
///
/// `thresholds[i]` is the smallest count that reaches level `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntensityScale {
    thresholds: Vec<u32>,
}

impl IntensityScale {
    pub fn new(thresholds: Vec<u32>) -> Result<Self, ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidValue {
            field: "intensity_thresholds".into(),
            message: message.into(),
        };
        if thresholds.is_empty() {
            return Err(invalid("at least one threshold is required"));
        }
        if thresholds[0] == 0 {
            return Err(invalid("thresholds must be greater than zero"));
        }
        if thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("thresholds must be strictly ascending"));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    pub fn max_level(&self) -> u8 {
        self.thresholds.len().min(u8::MAX as usize) as u8
    }

    pub fn level(&self, count: u32) -> u8 {
        self.thresholds.iter().take_while(|&&t| count >= t).count() as u8
    }

    /// Glyph for `level`; scales with more than four levels map their top
    /// levels onto the darkest glyph.
    pub fn glyph(&self, level: u8) -> char {
        LEVEL_GLYPHS[usize::from(level).min(LEVEL_GLYPHS.len() - 1)]
    }
}

impl Default for IntensityScale {
    fn default() -> Self {
        Self {
            thresholds: vec![1, 4, 7, 10],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u32,
    pub level: u8,
}

/// Completed focus runs per local date over `[today - window_days, today]`.
///
/// `window_days` is capped at [`MAX_WINDOW_DAYS`].
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBuckets {
    start: NaiveDate,
    counts: Vec<u32>,
}

impl DailyBuckets {
    pub fn compute<Tz: TimeZone>(
        records: &[SessionRecord],
        today: NaiveDate,
        window_days: u32,
        tz: &Tz,
    ) -> Self {
        let window_days = window_days.min(MAX_WINDOW_DAYS);
        let start = today
            .checked_sub_days(chrono::Days::new(u64::from(window_days)))
            .unwrap_or(NaiveDate::MIN);
        let len = (today - start).num_days() as usize + 1;
        let mut counts = vec![0u32; len];

        for record in records.iter().filter(|r| r.is_completed_focus()) {
            let date = local_date(record.start_time, tz);
            if date < start || date > today {
                continue;
            }
            let idx = (date - start).num_days() as usize;
            counts[idx] = counts[idx].saturating_add(1);
        }

        Self { start, counts }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.start + chrono::Duration::days(self.counts.len() as i64 - 1)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Count for `date`, zero outside the window.
    pub fn count(&self, date: NaiveDate) -> u32 {
        if date < self.start {
            return 0;
        }
        let idx = (date - self.start).num_days() as usize;
        self.counts.get(idx).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| (self.start + chrono::Duration::days(i as i64), c))
    }

    pub fn days(&self, scale: &IntensityScale) -> Vec<DayCount> {
        self.iter()
            .map(|(date, count)| DayCount {
                date,
                count,
                level: scale.level(count),
            })
            .collect()
    }
}

/// Render the buckets as a week-column grid with rows Sunday to Saturday.
pub fn render_grid(buckets: &DailyBuckets, scale: &IntensityScale) -> String {
    const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

    let lead = buckets.start().weekday().num_days_from_sunday() as usize;
    let weeks = (lead + buckets.len()).div_ceil(7);
    let mut grid = vec![vec![' '; weeks]; 7];
    for (i, (_, count)) in buckets.iter().enumerate() {
        let slot = lead + i;
        grid[slot % 7][slot / 7] = scale.glyph(scale.level(count));
    }

    let mut output = String::new();
    output.push_str(&format!(
        "Focus activity {} .. {} ({} pomodoros)\n",
        buckets.start(),
        buckets.end(),
        buckets.total()
    ));
    for (name, row) in DAY_NAMES.iter().zip(&grid) {
        output.push_str(&format!("{name:<4}"));
        output.extend(row.iter());
        output.push('\n');
    }

    let legend: String = (0..=scale.max_level()).map(|l| scale.glyph(l)).collect();
    output.push_str(&format!("Less [{legend}] More\n"));
    output
}
