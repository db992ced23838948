use super::*;
use crate::config::SchedulerConfig;
use crate::io::signals::SignalMessage;
use crate::schedule::store::MockSlotStore;
use crate::schedule::{MemoryStore, ScheduleSlot, SlotStore};
use crate::time::source::{ManualTimeSource, SimulatedTimeSource};
use crate::time::zone::Zone;
use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

type Shown = Arc<Mutex<Vec<DisplayContent>>>;

struct RecordingRenderer {
    shown: Shown,
    fail: bool,
}

impl Renderer for RecordingRenderer {
    fn show(&mut self, content: &DisplayContent) -> Result<()> {
        self.shown.lock().unwrap().push(content.clone());
        if self.fail {
            anyhow::bail!("screen unplugged");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// 2024-01-01 is a Monday
fn monday(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
}

fn slot(id: &str, h: u32) -> ScheduleSlot {
    ScheduleSlot::new(id, "tpl", Weekday::Mon, NaiveTime::from_hms_opt(h, 0, 0).unwrap())
}

fn core_with(store: Box<dyn SlotStore>, clock: Arc<dyn TimeSource>, fail: bool) -> (Core, Shown) {
    let config = SchedulerConfig::with_zone(Zone::Named(chrono_tz::UTC));
    let scheduler = Scheduler::new(store, clock.clone(), config).unwrap();
    let shown: Shown = Arc::default();
    let core = Core::new(CoreParams {
        scheduler,
        renderer: Box::new(RecordingRenderer {
            shown: shown.clone(),
            fail,
        }),
        clock,
        signal_state: SignalState::detached(),
        tick_interval: Duration::from_millis(200),
        empty_schedule_delay: Duration::from_secs(5),
        debug_enabled: false,
    });
    (core, shown)
}

fn shown_slot_ids(shown: &Shown) -> Vec<String> {
    shown
        .lock()
        .unwrap()
        .iter()
        .map(|content| match content {
            DisplayContent::Loading => "loading".to_string(),
            DisplayContent::Slot(slot) => slot.slot_id.clone(),
        })
        .collect()
}

#[test]
fn test_first_iteration_always_renders() {
    let store = MemoryStore::with_data(vec![slot("m9", 9)], vec![]);
    let clock = Arc::new(ManualTimeSource::new(monday(10, 0, 0)));
    let (mut core, shown) = core_with(Box::new(store), clock, false);

    core.run_iteration();
    core.run_iteration();
    assert_eq!(shown_slot_ids(&shown), ["m9"]);
}

#[test]
fn test_store_change_is_picked_up_and_redrawn() {
    let store = MemoryStore::with_data(vec![slot("m9", 9)], vec![]);
    let clock = Arc::new(ManualTimeSource::new(monday(10, 0, 0)));
    let (mut core, shown) = core_with(Box::new(store.clone()), clock, false);
    core.run_iteration();

    store.set_slots(vec![slot("m9", 9).with_display_text("Updated")]);
    core.run_iteration();

    let shown = shown.lock().unwrap();
    assert_eq!(shown.len(), 2);
    let DisplayContent::Slot(latest) = &shown[1] else {
        panic!("expected slot content");
    };
    assert_eq!(latest.display_text, "Updated");
}

#[test]
fn test_touch_without_data_change_does_not_redraw() {
    let store = MemoryStore::with_data(vec![slot("m9", 9)], vec![]);
    let clock = Arc::new(ManualTimeSource::new(monday(10, 0, 0)));
    let (mut core, shown) = core_with(Box::new(store.clone()), clock, false);
    core.run_iteration();

    store.touch();
    core.run_iteration();
    assert_eq!(shown.lock().unwrap().len(), 1);
    assert_eq!(core.scheduler().last_reload_marker(), store.modification_marker().unwrap());
}

#[test]
fn test_reload_message_forces_fetch() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let mut store = MockSlotStore::new();
    store
        .expect_modification_marker()
        .returning(|| Ok(ModificationMarker::from_counter(1)));
    let counter = fetches.clone();
    store.expect_fetch().returning(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok((vec![slot("m9", 9)], vec![]))
    });
    store.expect_describe().return_const("mock store".to_string());

    let clock = Arc::new(ManualTimeSource::new(monday(10, 0, 0)));
    let (mut core, _) = core_with(Box::new(store), clock, false);
    core.run_iteration();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    core.signal_state()
        .signal_sender
        .send(SignalMessage::Reload)
        .unwrap();
    core.run_iteration();
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[test]
fn test_failed_reload_waits_for_next_marker() {
    let marker = Arc::new(AtomicU64::new(1));
    let failing = Arc::new(AtomicBool::new(false));
    let fetches = Arc::new(AtomicUsize::new(0));

    let mut store = MockSlotStore::new();
    let current = marker.clone();
    store
        .expect_modification_marker()
        .returning(move || Ok(ModificationMarker::from_counter(current.load(Ordering::SeqCst))));
    let (fail, counter) = (failing.clone(), fetches.clone());
    store.expect_fetch().returning(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        if fail.load(Ordering::SeqCst) {
            anyhow::bail!("database is locked");
        }
        Ok((vec![slot("m9", 9)], vec![]))
    });
    store.expect_describe().return_const("mock store".to_string());

    let clock = Arc::new(ManualTimeSource::new(monday(10, 0, 0)));
    let (mut core, _) = core_with(Box::new(store), clock, false);

    failing.store(true, Ordering::SeqCst);
    marker.store(2, Ordering::SeqCst);
    core.run_iteration();
    core.run_iteration();
    core.run_iteration();
    // One attempt for marker 2, not one per iteration
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert_eq!(core.scheduler().current_slot().unwrap().id, "m9");

    failing.store(false, Ordering::SeqCst);
    marker.store(3, Ordering::SeqCst);
    core.run_iteration();
    assert_eq!(fetches.load(Ordering::SeqCst), 3);
    assert_eq!(
        core.scheduler().last_reload_marker(),
        ModificationMarker::from_counter(3)
    );
}

#[test]
fn test_redraw_message_forces_render() {
    let store = MemoryStore::with_data(vec![slot("m9", 9)], vec![]);
    let clock = Arc::new(ManualTimeSource::new(monday(10, 0, 0)));
    let (mut core, shown) = core_with(Box::new(store), clock, false);
    core.run_iteration();

    core.signal_state()
        .signal_sender
        .send(SignalMessage::Redraw)
        .unwrap();
    core.run_iteration();
    assert_eq!(shown_slot_ids(&shown), ["m9", "m9"]);
}

#[test]
fn test_renderer_failure_does_not_stop_loop() {
    let store = MemoryStore::with_data(vec![slot("m9", 9), slot("m13", 13)], vec![]);
    let clock = Arc::new(ManualTimeSource::new(monday(12, 59, 59)));
    let (mut core, shown) = core_with(Box::new(store), clock.clone(), true);

    core.run_iteration();
    clock.set(monday(13, 0, 1));
    core.run_iteration();
    assert_eq!(shown_slot_ids(&shown), ["m9", "m13"]);
    assert!(!core.scheduler().refresh_needed());
}

#[test]
fn test_sleep_depends_on_current_slot() {
    let store = MemoryStore::with_data(vec![slot("m9", 9)], vec![]);
    let clock = Arc::new(ManualTimeSource::new(monday(8, 0, 0)));
    let (mut core, _) = core_with(Box::new(store), clock.clone(), false);

    assert_eq!(core.run_iteration(), Duration::from_secs(5));
    clock.set(monday(9, 30, 0));
    assert_eq!(core.run_iteration(), Duration::from_millis(200));
}

#[test]
fn test_empty_schedule_wakes_for_upcoming_slot() {
    let store = MemoryStore::with_data(vec![slot("m9", 9)], vec![]);
    let clock = Arc::new(ManualTimeSource::new(monday(8, 59, 58)));
    let (mut core, shown) = core_with(Box::new(store), clock.clone(), false);

    let sleep = core.run_iteration();
    assert_eq!(sleep, Duration::from_secs(2) + Duration::from_millis(1));

    // Exactly at the due instant the slot is not yet promoted
    clock.set(monday(9, 0, 0));
    assert_eq!(core.run_iteration(), Duration::from_millis(1));

    clock.advance(chrono::Duration::milliseconds(1));
    assert_eq!(core.run_iteration(), Duration::from_millis(200));
    assert_eq!(shown_slot_ids(&shown), ["loading", "m9"]);
}

#[test]
fn test_shutdown_message_ends_execute() {
    let store = MemoryStore::with_data(vec![slot("m9", 9)], vec![]);
    let clock = Arc::new(ManualTimeSource::new(monday(10, 0, 0)));
    let (core, shown) = core_with(Box::new(store), clock, false);

    core.signal_state()
        .signal_sender
        .send(SignalMessage::Shutdown)
        .unwrap();
    core.execute().unwrap();
    assert_eq!(shown_slot_ids(&shown), ["m9"]);
}

#[test]
fn test_fast_forward_simulation_runs_to_end() {
    let store = MemoryStore::with_data(vec![slot("m9", 9)], vec![]);
    let clock = Arc::new(SimulatedTimeSource::new(
        monday(8, 59, 50),
        monday(9, 0, 10),
        0.0,
    ));
    let (core, shown) = core_with(Box::new(store), clock.clone(), false);

    core.execute().unwrap();
    assert!(clock.is_ended());
    assert_eq!(shown_slot_ids(&shown), ["loading", "m9"]);
}
