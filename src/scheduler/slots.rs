//! Slot ordering and the weekly-cycle arithmetic the engine is built on.

use chrono::{Datelike, Days, NaiveDateTime};
use std::borrow::Borrow;

use crate::schedule::ScheduleSlot;
use crate::time::weekday::END_OF_DAY;

/// Sort slots by `(weekday, start_time)` and derive each slot's `end_time`.
///
/// The sort is stable, so slots sharing a weekday and start time keep their input
/// order. Within a weekday each slot ends where the following one starts; the last
/// slot of the day ends at 23:59:59.
pub fn sort_slots(slots: &mut [ScheduleSlot]) {
    slots.sort_by_key(|slot| (slot.weekday_index(), slot.start_time));
    derive_end_times(slots);
}

fn derive_end_times(slots: &mut [ScheduleSlot]) {
    let count = slots.len();
    for idx in 0..count {
        let end_time = match slots.get(idx + 1) {
            Some(following) if following.weekday == slots[idx].weekday => following.start_time,
            _ => END_OF_DAY,
        };
        slots[idx].end_time = end_time;
    }
}

/// The first wall-clock occurrence of `slot` after `reference`.
///
/// With `inclusive`, an occurrence exactly at `reference` counts; this is how a slot
/// sharing its start time with the one before it still gets its turn.
pub fn next_occurrence(
    slot: &ScheduleSlot,
    reference: NaiveDateTime,
    inclusive: bool,
) -> NaiveDateTime {
    (0..=7u64)
        .filter_map(|offset| reference.date().checked_add_days(Days::new(offset)))
        .filter(|date| date.weekday() == slot.weekday)
        .map(|date| date.and_time(slot.start_time))
        .find(|candidate| *candidate > reference || (inclusive && *candidate == reference))
        // Only reachable at the very end of chrono's date range
        .unwrap_or(NaiveDateTime::MAX)
}

/// Index of the slot that starts soonest at or after `reference`.
///
/// Used when nothing is current yet. Among slots sharing a start, the last in sorted
/// order wins, the same rule current-slot selection applies.
pub fn upcoming_slot_index<S: Borrow<ScheduleSlot>>(
    slots: &[S],
    reference: NaiveDateTime,
) -> Option<usize> {
    slots
        .iter()
        .enumerate()
        .rev()
        .min_by_key(|(_, slot)| {
            next_occurrence(<S as Borrow<ScheduleSlot>>::borrow(slot), reference, true)
        })
        .map(|(idx, _)| idx)
}
