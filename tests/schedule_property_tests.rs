use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use proptest::prelude::*;
use std::sync::Arc;

use kenban::config::SchedulerConfig;
use kenban::logger::Log;
use kenban::schedule::{MemoryStore, ScheduleSlot};
use kenban::scheduler::Scheduler;
use kenban::scheduler::slots::sort_slots;
use kenban::time::source::{ManualTimeSource, TimeSource};
use kenban::time::weekday::END_OF_DAY;
use kenban::time::zone::Zone;

/// Slots with arbitrary (possibly repeated) weekday and minute-of-day starts
fn slots_strategy() -> impl Strategy<Value = Vec<ScheduleSlot>> {
    prop::collection::vec((0u8..7, 0u32..1440), 0..16).prop_map(build_slots)
}

/// Slots whose (weekday, start) pairs are all distinct
fn distinct_slots_strategy() -> impl Strategy<Value = Vec<ScheduleSlot>> {
    prop::collection::btree_set((0u8..7, 0u32..1440), 0..12)
        .prop_map(|starts| build_slots(starts.into_iter().collect()))
}

fn build_slots(starts: Vec<(u8, u32)>) -> Vec<ScheduleSlot> {
    starts
        .into_iter()
        .enumerate()
        .map(|(idx, (day, minute))| {
            let weekday = Weekday::try_from(day).unwrap();
            let start = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0).unwrap();
            ScheduleSlot::new(format!("slot-{idx}"), "tpl", weekday, start)
        })
        .collect()
}

/// Any minute of the week beginning Monday 2024-01-01
fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..7 * 1440).prop_map(|minute| week_start() + Duration::minutes(minute))
}

fn week_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn scheduler_at(slots: Vec<ScheduleSlot>, clock: Arc<ManualTimeSource>) -> Scheduler {
    let config = SchedulerConfig::with_zone(Zone::Named(chrono_tz::UTC));
    Scheduler::new(Box::new(MemoryStore::with_data(slots, vec![])), clock, config).unwrap()
}

fn current_id(scheduler: &Scheduler) -> Option<String> {
    scheduler.current_slot().map(|slot| slot.id.clone())
}

#[cfg(test)]
mod slot_ordering_tests {
    use super::*;

    proptest! {
        /// Sorted slots are ordered by weekday, then start time
        #[test]
        fn test_sort_is_ordered(mut slots in slots_strategy()) {
            sort_slots(&mut slots);
            for pair in slots.windows(2) {
                let a = (pair[0].weekday.num_days_from_monday(), pair[0].start_time);
                let b = (pair[1].weekday.num_days_from_monday(), pair[1].start_time);
                prop_assert!(a <= b, "{:?} sorted before {:?}", a, b);
            }
        }

        /// Each slot ends where the next one on its weekday starts, else at 23:59:59
        #[test]
        fn test_end_times_are_derived(mut slots in slots_strategy()) {
            sort_slots(&mut slots);
            for (idx, slot) in slots.iter().enumerate() {
                let expected = match slots.get(idx + 1) {
                    Some(next) if next.weekday == slot.weekday => next.start_time,
                    _ => END_OF_DAY,
                };
                prop_assert_eq!(slot.end_time, expected);
                prop_assert!(slot.end_time >= slot.start_time);
            }
        }
    }
}

#[cfg(test)]
mod current_slot_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Input order never affects which slot is current
        #[test]
        fn test_current_slot_ignores_input_order(
            (slots, shuffled) in distinct_slots_strategy()
                .prop_flat_map(|slots| (Just(slots.clone()), Just(slots).prop_shuffle())),
            now in instant_strategy()
        ) {
            Log::set_enabled(false);
            let a = scheduler_at(slots, Arc::new(ManualTimeSource::new(now)));
            let b = scheduler_at(shuffled, Arc::new(ManualTimeSource::new(now)));
            prop_assert_eq!(current_id(&a), current_id(&b));
        }

        /// The current slot started earlier today and is the latest such slot
        #[test]
        fn test_current_slot_is_latest_started_today(
            slots in distinct_slots_strategy(),
            now in instant_strategy()
        ) {
            Log::set_enabled(false);
            let mut scheduler = scheduler_at(slots.clone(), Arc::new(ManualTimeSource::new(now)));
            let wall = now.naive_utc();
            let started_today = slots
                .iter()
                .filter(|s| s.weekday == wall.weekday())
                .filter(|s| s.start_time < wall.time())
                .map(|s| s.start_time)
                .max();

            match scheduler.current_slot() {
                Some(current) => {
                    prop_assert_eq!(Some(current.start_time), started_today);
                    prop_assert!(current.start_time < wall.time());
                }
                None => prop_assert_eq!(started_today, None),
            }

            // Recomputing at the same instant changes nothing
            let before = current_id(&scheduler);
            scheduler.calculate_current_slot();
            prop_assert_eq!(current_id(&scheduler), before);
            prop_assert!(!scheduler.refresh_needed());
        }

        /// Ticking minute by minute tracks the most recently started slot of the week
        #[test]
        fn test_ticking_follows_weekly_cycle(
            slots in distinct_slots_strategy(),
            start in instant_strategy()
        ) {
            Log::set_enabled(false);
            let clock = Arc::new(ManualTimeSource::new(start));
            let mut ticking = scheduler_at(slots.clone(), clock.clone());
            let started_on_load = ticking.current_slot().is_some();

            for _ in 0..1500 {
                clock.advance(Duration::minutes(1));
                ticking.tick();

                let now = clock.now().naive_utc();
                let expected = match latest_started(&slots, now) {
                    Some((id, began)) if started_on_load || began >= start.naive_utc() => Some(id),
                    _ => None,
                };
                prop_assert_eq!(current_id(&ticking), expected, "diverged at {}", now);
            }
        }
    }
}

/// The slot whose latest occurrence strictly before `now` is the most recent, and
/// when that occurrence began.
fn latest_started(slots: &[ScheduleSlot], now: NaiveDateTime) -> Option<(String, NaiveDateTime)> {
    slots
        .iter()
        .map(|slot| {
            let days_back = (now.weekday().num_days_from_monday() + 7
                - slot.weekday.num_days_from_monday())
                % 7;
            let mut began = (now.date() - Duration::days(days_back as i64)).and_time(slot.start_time);
            if began >= now {
                began -= Duration::days(7);
            }
            (slot.id.clone(), began)
        })
        .max_by_key(|(_, began)| *began)
}
