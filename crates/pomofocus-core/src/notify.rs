//! Transient user notifications.
//!
//! The timer pushes a notification when a phase completes and when a store
//! write fails. Sinks decide how to present them.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Default display time of a notification.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// Display time; `None` takes the default of whoever shows it.
    #[serde(default, with = "duration_ms", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
            duration: None,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".into(),
            description: description.into(),
            severity: Severity::Error,
            duration: None,
        }
    }

    /// Announcement for a phase that ran out naturally.
    pub fn phase_completed(phase: Phase) -> Self {
        let description = match phase {
            Phase::Focus => "Great job! Take a break now.",
            Phase::ShortRest | Phase::LongRest => "Break is over. Ready to focus again?",
        };
        Self::info(format!("{} completed!", phase.label()), description)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&mut self, n: Notification) {
        match n.severity {
            Severity::Info => tracing::info!(title = %n.title, "{}", n.description),
            Severity::Error => tracing::error!(title = %n.title, "{}", n.description),
        }
    }
}

/// Bounded queue of visible notifications.
///
/// The oldest entry is dropped when the queue is full; entries disappear
/// once their duration has passed.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    limit: usize,
    default_duration: Duration,
    entries: VecDeque<Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    notification: Notification,
    expires_at: DateTime<Utc>,
}

impl NotificationQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            default_duration: DEFAULT_DURATION,
            entries: VecDeque::new(),
        }
    }

    /// Display time for notifications that don't set their own.
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    pub fn push_at(&mut self, mut notification: Notification, now: DateTime<Utc>) {
        let duration = *notification.duration.get_or_insert(self.default_duration);
        let ttl = chrono::Duration::from_std(duration)
            .unwrap_or_else(|_| chrono::Duration::seconds(5));
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(Entry {
            notification,
            expires_at: now + ttl,
        });
    }

    /// Notifications still visible at `now`, oldest first.
    pub fn active(&mut self, now: DateTime<Utc>) -> Vec<&Notification> {
        self.entries.retain(|e| e.expires_at > now);
        self.entries.iter().map(|e| &e.notification).collect()
    }

    /// Remove and return everything queued.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.entries.drain(..).map(|e| e.notification).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(3)
    }
}

impl NotificationSink for NotificationQueue {
    fn notify(&mut self, notification: Notification) {
        self.push_at(notification, Utc::now());
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap()
    }

    #[test]
    fn completion_messages() {
        let focus = Notification::phase_completed(Phase::Focus);
        assert_eq!(focus.title, "Focus completed!");
        assert_eq!(focus.description, "Great job! Take a break now.");
        assert_eq!(focus.duration, None);

        let rest = Notification::phase_completed(Phase::LongRest);
        assert_eq!(rest.title, "Long Break completed!");
        assert_eq!(rest.description, "Break is over. Ready to focus again?");
        assert_eq!(rest.severity, Severity::Info);
    }

    #[test]
    fn queue_expires_entries() {
        let mut queue = NotificationQueue::new(3);
        queue.push_at(Notification::error("Failed to save session"), t0());
        assert_eq!(queue.active(t0() + chrono::Duration::seconds(4)).len(), 1);
        assert!(queue.active(t0() + chrono::Duration::seconds(5)).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_drops_oldest_when_full() {
        let mut queue = NotificationQueue::new(2);
        for title in ["a", "b", "c"] {
            queue.push_at(Notification::info(title, ""), t0());
        }
        let titles: Vec<_> = queue.drain().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[test]
    fn default_duration_can_be_configured() {
        let mut queue = NotificationQueue::new(3).with_default_duration(Duration::from_secs(1));
        queue.push_at(Notification::info("x", ""), t0());
        assert!(queue.active(t0() + chrono::Duration::seconds(2)).is_empty());
    }

    #[test]
    fn explicit_duration_wins_over_configured_default() {
        let mut queue = NotificationQueue::new(3).with_default_duration(Duration::from_secs(1));
        queue.push_at(Notification::info("x", "").with_duration(DEFAULT_DURATION), t0());
        let active = queue.active(t0() + chrono::Duration::seconds(3));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].duration, Some(Duration::from_secs(5)));
        assert!(queue.active(t0() + chrono::Duration::seconds(5)).is_empty());
    }

    #[test]
    fn serializes_duration_in_millis() {
        let mut queue = NotificationQueue::default();
        queue.push_at(Notification::error("boom"), t0());
        let json = serde_json::to_value(&queue.drain()[0]).unwrap();
        assert_eq!(json["duration"], 5000);
        assert_eq!(json["severity"], "error");

        let unset = serde_json::to_value(Notification::error("boom")).unwrap();
        assert!(unset.get("duration").is_none());
        let back: Notification = serde_json::from_value(unset).unwrap();
        assert_eq!(back.duration, None);
    }
}
