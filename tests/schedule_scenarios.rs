//! End-to-end behaviour of the engine through the public API.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc, Weekday};
use std::fs::{File, FileTimes};
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tempfile::tempdir;

use kenban::config::SchedulerConfig;
use kenban::schedule::{Event, JsonFileStore, MemoryStore, ScheduleSlot};
use kenban::scheduler::{ReloadOutcome, Scheduler};
use kenban::time::source::{ManualTimeSource, TimeSource};
use kenban::time::weekday::END_OF_DAY;
use kenban::time::zone::Zone;

// 2024-01-01 is a Monday
fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, h, m, 0).unwrap()
}

fn monday_slot(id: &str, h: u32) -> ScheduleSlot {
    ScheduleSlot::new(id, "tpl", Weekday::Mon, NaiveTime::from_hms_opt(h, 0, 0).unwrap())
}

fn monday_slots() -> Vec<ScheduleSlot> {
    vec![monday_slot("m9", 9), monday_slot("m13", 13), monday_slot("m18", 18)]
}

fn engine(store: MemoryStore, now: DateTime<Utc>) -> (Scheduler, Arc<ManualTimeSource>) {
    let clock = Arc::new(ManualTimeSource::new(now));
    let config = SchedulerConfig::with_zone(Zone::Named(chrono_tz::UTC));
    let scheduler = Scheduler::new(Box::new(store), clock.clone(), config).unwrap();
    (scheduler, clock)
}

#[test]
fn monday_morning_shows_first_slot() {
    let (scheduler, _) = engine(MemoryStore::with_data(monday_slots(), vec![]), at(1, 10, 0));

    let current = scheduler.current_slot().unwrap();
    assert_eq!(current.id, "m9");
    assert_eq!(current.end_time, NaiveTime::from_hms_opt(13, 0, 0).unwrap());
    assert_eq!(scheduler.next_slot().unwrap().id, "m13");
}

#[test]
fn late_monday_wraps_to_next_week() {
    let (scheduler, _) = engine(MemoryStore::with_data(monday_slots(), vec![]), at(1, 23, 0));

    let current = scheduler.current_slot().unwrap();
    assert_eq!(current.id, "m18");
    assert_eq!(current.end_time, END_OF_DAY);
    assert_eq!(scheduler.next_slot().unwrap().id, "m9");
}

#[test]
fn day_without_slots_has_no_current_slot() {
    let (scheduler, _) = engine(MemoryStore::with_data(monday_slots(), vec![]), at(2, 10, 0));
    assert!(scheduler.current_slot().is_none());
}

#[test]
fn event_is_active_strictly_inside_its_window() {
    let event = Event::new("e", at(1, 10, 0), at(1, 12, 0));
    let (mut scheduler, clock) =
        engine(MemoryStore::with_data(vec![], vec![event.clone()]), at(1, 11, 0));

    assert!(scheduler.event_active());
    assert_eq!(scheduler.active_events(), &[event]);

    clock.set(at(1, 12, 0));
    scheduler.tick();
    assert!(!scheduler.event_active());
}

#[test]
fn repeated_reload_of_same_data_changes_nothing() {
    let store = MemoryStore::with_data(monday_slots(), vec![]);
    let (mut scheduler, _) = engine(store.clone(), at(1, 10, 0));
    let before = scheduler.current_slot().unwrap();

    store.replace(monday_slots(), vec![]);
    assert_eq!(scheduler.reload().unwrap(), ReloadOutcome::Unchanged);
    store.replace(monday_slots(), vec![]);
    assert_eq!(scheduler.reload().unwrap(), ReloadOutcome::Unchanged);

    assert!(Arc::ptr_eq(&before, &scheduler.current_slot().unwrap()));
    assert!(!scheduler.refresh_needed());
}

#[test]
fn full_day_walkthrough() {
    let event = Event::new("lunch", at(1, 12, 0), at(1, 13, 30));
    let (mut scheduler, clock) =
        engine(MemoryStore::with_data(monday_slots(), vec![event]), at(1, 8, 0));
    assert!(scheduler.current_slot().is_none());

    let mut seen = Vec::new();
    let end = at(2, 0, 30);
    while clock.now() < end {
        clock.advance(Duration::minutes(1));
        scheduler.tick();
        if scheduler.clear_refresh_needed() {
            let slot = scheduler.current_slot().map(|s| s.id.clone());
            seen.push((slot, scheduler.event_active()));
        }
    }

    let expected: Vec<(Option<String>, bool)> = vec![
        (Some("m9".into()), false),
        (Some("m9".into()), true),
        (Some("m13".into()), true),
        (Some("m13".into()), false),
        (Some("m18".into()), false),
    ];
    assert_eq!(seen, expected);
    // Tuesday has no slots, so Monday's last slot is still up
    assert_eq!(scheduler.current_slot().unwrap().id, "m18");
}

fn write_store(path: &Path, json: &str, mtime_secs: u64) {
    std::fs::write(path, json).unwrap();
    let mtime = UNIX_EPOCH + std::time::Duration::from_secs(mtime_secs);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_times(FileTimes::new().set_modified(mtime))
        .unwrap();
}

#[test]
fn json_store_reload_cycle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schedule.json");
    write_store(
        &path,
        r#"{"slots": [{"uuid": "a", "template_uuid": "t", "start_time": "09:00", "weekday": "Monday"}]}"#,
        1_700_000_000,
    );

    let clock = Arc::new(ManualTimeSource::new(at(1, 10, 0)));
    let config = SchedulerConfig::with_zone(Zone::Named(chrono_tz::UTC));
    let mut scheduler =
        Scheduler::new(Box::new(JsonFileStore::new(&path)), clock, config).unwrap();
    assert_eq!(scheduler.current_slot().unwrap().id, "a");
    assert!(!scheduler.store_changed().unwrap());

    write_store(
        &path,
        r#"{"slots": [
            {"uuid": "a", "template_uuid": "t", "start_time": "09:00", "weekday": "Monday"},
            {"uuid": "b", "template_uuid": "t", "start_time": "09:30", "weekday": "Monday"}
        ]}"#,
        1_700_000_100,
    );
    assert!(scheduler.store_changed().unwrap());
    assert!(matches!(
        scheduler.reload().unwrap(),
        ReloadOutcome::Updated {
            slots_changed: true,
            events_changed: false
        }
    ));
    assert_eq!(scheduler.current_slot().unwrap().id, "b");
    assert!(scheduler.refresh_needed());

    // A deleted store reloads to empty
    std::fs::remove_file(&path).unwrap();
    assert!(scheduler.store_changed().unwrap());
    scheduler.reload().unwrap();
    assert!(scheduler.current_slot().is_none());
}
