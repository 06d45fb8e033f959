//! Statistics computed from records written through the store.

use chrono::{Duration, NaiveDate, Utc};
use pomofocus_core::stats::{render_grid, DailyBuckets, StatsOptions, StatsReport};
use pomofocus_core::storage::{Database, SessionStore, TaskStore};
use pomofocus_core::{Phase, SessionId, SessionQuery, SessionRecord, UserRef};

fn ada() -> UserRef {
    UserRef::new("ada").unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()
}

fn import(db: &Database, n: usize, days_ago: i64, phase: Phase, closed: bool) {
    for i in 0..n {
        let start = (today() - Duration::days(days_ago))
            .and_hms_opt(8 + i as u32, 0, 0)
            .unwrap()
            .and_utc();
        db.import_session(&SessionRecord {
            id: SessionId::from(format!("{days_ago}-{i}-{}", phase.as_str())),
            user_id: "ada".into(),
            start_time: start,
            end_time: closed.then(|| start + Duration::minutes(25)),
            phase,
            task_id: None,
        })
        .unwrap();
    }
}

#[test]
fn report_from_stored_history() {
    let db = Database::open_memory().unwrap();
    import(&db, 2, 0, Phase::Focus, true);
    import(&db, 1, 0, Phase::Focus, false);
    import(&db, 5, 1, Phase::Focus, true);
    import(&db, 3, 1, Phase::ShortRest, true);
    import(&db, 1, 2, Phase::Focus, true);
    import(&db, 4, 120, Phase::Focus, true);

    let done = db.create_task(&ada(), "done").unwrap();
    db.set_task_completed(&ada(), &done.id, true).unwrap();
    db.create_task(&ada(), "pending").unwrap();

    let records = db
        .query_sessions(&ada(), &SessionQuery::completed_focus())
        .unwrap();
    let report = StatsReport::compute(
        &records,
        db.count_completed_tasks(&ada()).unwrap(),
        today(),
        &Utc,
        &StatsOptions::default(),
    );

    assert_eq!(report.summary.total_count, 12);
    assert_eq!(report.summary.total_focus_secs, 12 * 1500);
    assert_eq!(report.summary.current_streak, 3);
    assert_eq!(report.summary.tasks_completed, 1);

    let last = report.days.last().unwrap();
    assert_eq!((last.date, last.count, last.level), (today(), 2, 1));
    let yesterday = &report.days[report.days.len() - 2];
    assert_eq!((yesterday.count, yesterday.level), (5, 2));
    assert_eq!(report.days.iter().map(|d| d.count).sum::<u32>(), 8);
}

#[test]
fn report_is_idempotent_and_serializable() {
    let db = Database::open_memory().unwrap();
    import(&db, 3, 0, Phase::Focus, true);
    let records = db
        .query_sessions(&ada(), &SessionQuery::completed_focus())
        .unwrap();

    let a = StatsReport::compute(&records, 0, today(), &Utc, &StatsOptions::default());
    let b = StatsReport::compute(&records, 0, today(), &Utc, &StatsOptions::default());
    assert_eq!(a, b);

    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["summary"]["total_count"], 3);
    assert_eq!(json["today"], "2026-09-30");
    assert_eq!(json["days"].as_array().unwrap().len(), 91);
}

#[test]
fn heatmap_grid_renders_window() {
    let db = Database::open_memory().unwrap();
    import(&db, 10, 0, Phase::Focus, true);
    let records = db
        .query_sessions(&ada(), &SessionQuery::completed_focus())
        .unwrap();
    let options = StatsOptions::default();
    let buckets = DailyBuckets::compute(&records, today(), options.window_days, &Utc);
    let grid = render_grid(&buckets, &options.scale);
    assert!(grid.contains('█'));
    assert!(grid.starts_with("Focus activity 2026-07-02 .. 2026-09-30 (10 pomodoros)"));
}
