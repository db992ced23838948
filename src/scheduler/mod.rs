//! The slot/event scheduling engine.
//!
//! [`Scheduler`] owns the weekly slots and the one-off events loaded from a
//! [`SlotStore`] and decides what should be on screen at the instant its clock reports.
//! The driving loop calls [`Scheduler::tick`] on a fixed cadence and
//! [`Scheduler::reload`] whenever the store's modification marker moves.
//!
//! ## Slot progression
//!
//! The current slot is the latest slot of today that has already started. Once it
//! is chosen, the engine tracks the wall-clock instant its successor in the weekly
//! cycle is due. A tick promotes the successor
//! once that instant has passed, at most one slot per tick. Because the due instant is
//! a full date and time, a successor that wraps round to next week is not promoted
//! early just because it shares today's weekday.
//!
//! Ticks only promote. The running slot stays on screen across midnight, and through
//! days without slots, until its successor is due. Only a clock moving backwards makes
//! a tick recompute the current slot from scratch.
//!
//! ## Redraws
//!
//! The engine raises `refresh_needed` itself whenever the current slot or the active
//! events change value across a `tick`, `reload` or recalculation. A reload that finds
//! the same data changes nothing and raises nothing.

pub mod events;
pub mod shared;
pub mod slots;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::schedule::{Event, ModificationMarker, ScheduleSlot, SlotStore};
use crate::time::source::TimeSource;
use crate::time::weekday::weekday_name;

pub use events::DayWindow;
pub use shared::{ScheduleSnapshot, SharedSchedule};

/// What a [`Scheduler::reload`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Fetched data equals what the engine already holds
    Unchanged,
    Updated {
        slots_changed: bool,
        events_changed: bool,
    },
}

/// The renderer-visible state, compared before and after each operation.
type View = (Option<Arc<ScheduleSlot>>, Vec<Event>);

fn same_view(before: &View, after: &View) -> bool {
    let slots_match = match (&before.0, &after.0) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
        _ => false,
    };
    slots_match && before.1 == after.1
}

/// Decides which slot and events are on screen; see the module docs.
pub struct Scheduler {
    store: Box<dyn SlotStore>,
    clock: Arc<dyn TimeSource>,
    config: SchedulerConfig,

    /// Sorted by `(weekday, start_time)` with derived end times
    slots: Vec<Arc<ScheduleSlot>>,
    /// Events that had not ended at the last reload
    events: Vec<Event>,

    current_index: Option<usize>,
    next_index: Option<usize>,
    /// Wall-clock instant after which the next slot takes over
    next_due: Option<NaiveDateTime>,
    /// Wall clock at the last evaluation, to spot the clock moving backwards
    last_evaluated: Option<NaiveDateTime>,

    daily_events: Vec<Event>,
    daily_events_date: Option<NaiveDate>,
    active_events: Vec<Event>,

    last_reload_marker: ModificationMarker,
    no_next_reported: bool,
    shared: Arc<SharedSchedule>,
}

impl Scheduler {
    /// Load everything from `store` and evaluate it against `clock`.
    ///
    /// `refresh_needed` starts cleared.
    pub fn new(
        store: Box<dyn SlotStore>,
        clock: Arc<dyn TimeSource>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        let marker = store
            .modification_marker()
            .with_context(|| format!("Failed to read version of {}", store.describe()))?;
        let (slots, events) = store
            .fetch()
            .with_context(|| format!("Failed to load schedule from {}", store.describe()))?;

        let now = clock.now();
        let wall = config.zone.wall_clock(now);
        let shared = Arc::new(SharedSchedule::new(ScheduleSnapshot::empty(now, wall)));

        let mut scheduler = Self {
            store,
            clock,
            config,
            slots: Vec::new(),
            events: Vec::new(),
            current_index: None,
            next_index: None,
            next_due: None,
            last_evaluated: None,
            daily_events: Vec::new(),
            daily_events_date: None,
            active_events: Vec::new(),
            last_reload_marker: marker,
            no_next_reported: false,
            shared,
        };

        scheduler.slots = sorted_arcs(slots);
        scheduler.events = events::prune_ended(events, now);
        scheduler.select_current_slot(wall);
        scheduler.refresh_daily_events(wall.date());
        scheduler.refresh_active_events(now);

        if scheduler.config.debug {
            log_debug!(
                "Scheduler loaded {} slots and {} events from {}",
                scheduler.slots.len(),
                scheduler.events.len(),
                scheduler.store.describe()
            );
        }

        scheduler.publish(now, wall, false);
        Ok(scheduler)
    }

    // # Operations

    /// Recompute the current slot from scratch for the clock's current instant.
    pub fn calculate_current_slot(&mut self) {
        self.observe(|scheduler, _, wall| scheduler.select_current_slot(wall));
    }

    /// Recompute today's event cache.
    pub fn calculate_daily_events(&mut self) {
        self.observe(|scheduler, _, wall| scheduler.refresh_daily_events(wall.date()));
    }

    /// Recompute the active events from today's cache.
    pub fn calculate_current_events(&mut self) {
        self.observe(|scheduler, now, _| scheduler.refresh_active_events(now));
    }

    /// Advance the engine to the clock's current instant.
    ///
    /// Promotes at most one slot, then refreshes the daily event cache if the day
    /// changed, then the active events. A new day alone never replaces the current slot.
    pub fn tick(&mut self) {
        self.observe(|scheduler, now, wall| {
            // The running slot stays current across midnight until its successor is due
            match scheduler.last_evaluated {
                Some(previous) if wall < previous => {
                    if scheduler.config.debug {
                        log_debug!("Clock moved backwards, re-evaluating current slot");
                    }
                    scheduler.select_current_slot(wall);
                }
                _ => scheduler.advance_slot(wall),
            }
            scheduler.last_evaluated = Some(wall);

            if scheduler.daily_events_date != Some(wall.date()) {
                scheduler.refresh_daily_events(wall.date());
            }
            scheduler.refresh_active_events(now);
        });
    }

    /// Re-fetch from the store and apply the result.
    ///
    /// A failed fetch leaves every piece of engine state untouched.
    pub fn reload(&mut self) -> Result<ReloadOutcome> {
        // Marker first: a write racing the fetch shows up as a newer marker next poll
        let marker = self.store_marker()?;
        let (slots, events) = self
            .store
            .fetch()
            .with_context(|| format!("Failed to load schedule from {}", self.store.describe()))?;
        Ok(self.apply_snapshot(slots, events, marker))
    }

    /// Apply freshly fetched data recorded at `marker`.
    ///
    /// Both sides are normalised (slots sorted, ended events pruned) before comparing,
    /// so unchanged upstream data is always recognised as unchanged.
    pub fn apply_snapshot(
        &mut self,
        mut slots: Vec<ScheduleSlot>,
        events: Vec<Event>,
        marker: ModificationMarker,
    ) -> ReloadOutcome {
        let now = self.clock.now();
        self.last_reload_marker = marker;

        slots::sort_slots(&mut slots);
        let slots_changed = slots.len() != self.slots.len()
            || slots
                .iter()
                .zip(&self.slots)
                .any(|(new, old)| new != old.as_ref());

        let events = events::prune_ended(events, now);
        let events_changed = !events
            .iter()
            .eq(self.events.iter().filter(|e| !e.has_ended(now)));

        if !slots_changed && !events_changed {
            if self.config.debug {
                log_debug!("No change in schedule data");
            }
            return ReloadOutcome::Unchanged;
        }

        self.observe(|scheduler, now, wall| {
            if slots_changed {
                scheduler.slots = slots.into_iter().map(Arc::new).collect();
                scheduler.select_current_slot(wall);
            }
            if events_changed {
                scheduler.events = events;
            }
            scheduler.refresh_daily_events(wall.date());
            scheduler.refresh_active_events(now);
        });

        log_block_start!(
            "Schedule reloaded: {} slots, {} events",
            self.slots.len(),
            self.events.len()
        );

        ReloadOutcome::Updated {
            slots_changed,
            events_changed,
        }
    }

    /// Whether the store has moved on from the data last loaded.
    ///
    /// Any difference counts, not only a newer marker: a deleted store reads as the
    /// zero marker and must reload to empty.
    pub fn store_changed(&self) -> Result<bool> {
        Ok(self.store_marker()? != self.last_reload_marker)
    }

    /// The store's current modification marker.
    pub fn store_marker(&self) -> Result<ModificationMarker> {
        self.store
            .modification_marker()
            .with_context(|| format!("Failed to read version of {}", self.store.describe()))
    }

    // # Accessors

    pub fn current_slot(&self) -> Option<Arc<ScheduleSlot>> {
        self.current_index.map(|idx| Arc::clone(&self.slots[idx]))
    }

    /// Position of the current slot in [`Scheduler::slots`]
    pub fn current_slot_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn next_slot(&self) -> Option<Arc<ScheduleSlot>> {
        self.next_index.map(|idx| Arc::clone(&self.slots[idx]))
    }

    pub fn next_slot_due(&self) -> Option<NaiveDateTime> {
        self.next_due
    }

    pub fn slots(&self) -> &[Arc<ScheduleSlot>] {
        &self.slots
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn daily_events(&self) -> &[Event] {
        &self.daily_events
    }

    pub fn daily_events_date(&self) -> Option<NaiveDate> {
        self.daily_events_date
    }

    /// Every event active right now, in list order.
    pub fn active_events(&self) -> &[Event] {
        &self.active_events
    }

    /// The first active event in list order, for displays that show one.
    pub fn primary_event(&self) -> Option<&Event> {
        self.active_events.first()
    }

    pub fn event_active(&self) -> bool {
        !self.active_events.is_empty()
    }

    pub fn refresh_needed(&self) -> bool {
        self.shared.refresh_needed()
    }

    /// Ask for a redraw even though nothing visible changed.
    pub fn request_refresh(&self) {
        self.shared.request_refresh();
    }

    /// Acknowledge a redraw. Returns whether one was pending.
    pub fn clear_refresh_needed(&self) -> bool {
        self.shared.clear_refresh_needed()
    }

    pub fn last_reload_marker(&self) -> ModificationMarker {
        self.last_reload_marker
    }

    /// Handle for renderers on other threads.
    pub fn shared(&self) -> Arc<SharedSchedule> {
        Arc::clone(&self.shared)
    }

    pub fn snapshot(&self) -> Arc<ScheduleSnapshot> {
        self.shared.snapshot()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // # Internals

    /// Run `update` against the clock's current instant, then publish a snapshot and
    /// raise `refresh_needed` if the visible state changed.
    fn observe(&mut self, update: impl FnOnce(&mut Self, DateTime<Utc>, NaiveDateTime)) {
        let now = self.clock.now();
        let wall = self.config.zone.wall_clock(now);
        let before = self.view();
        update(self, now, wall);
        let changed = !same_view(&before, &self.view());
        if changed {
            self.log_view_change();
        }
        self.publish(now, wall, changed);
    }

    fn view(&self) -> View {
        (self.current_slot(), self.active_events.clone())
    }

    fn publish(&self, now: DateTime<Utc>, wall: NaiveDateTime, refresh: bool) {
        let snapshot = ScheduleSnapshot {
            evaluated_at: now,
            wall_clock: wall,
            current_slot: self.current_slot(),
            next_slot: self.next_slot(),
            next_slot_due: self.next_due,
            active_events: self.active_events.clone(),
            event_active: self.event_active(),
        };
        self.shared.publish(snapshot, refresh);
    }

    fn log_view_change(&self) {
        if !self.config.debug {
            return;
        }
        match self.current_slot() {
            Some(slot) => log_debug!(
                "Current slot: {} ({} {}, ends {})",
                slot.id,
                weekday_name(slot.weekday),
                slot.start_time.format("%H:%M:%S"),
                slot.end_time.format("%H:%M:%S")
            ),
            None => log_debug!("Current slot: none"),
        }
        if !self.active_events.is_empty() {
            let ids: Vec<&str> = self.active_events.iter().map(|e| e.id.as_str()).collect();
            log_indented!("Active events: {}", ids.join(", "));
        }
    }

    /// Pick the latest slot of today that has already started.
    ///
    /// Among slots sharing that start time, the last in sorted order (so the last in
    /// input order) wins.
    fn select_current_slot(&mut self, wall: NaiveDateTime) {
        self.last_evaluated = Some(wall);
        let today = wall.weekday();
        let time = wall.time();

        let chosen = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.weekday == today && slot.start_time < time)
            .max_by_key(|(_, slot)| slot.start_time)
            .map(|(idx, _)| idx);

        match chosen {
            Some(idx) => {
                let started = wall.date().and_time(self.slots[idx].start_time);
                self.set_current(idx, started);
            }
            None => {
                if self.slots.is_empty() {
                    log_warning!("No schedule slots loaded");
                } else {
                    log_warning!(
                        "No slot has started yet on {} at {}",
                        weekday_name(today),
                        time.format("%H:%M:%S")
                    );
                }
                self.current_index = None;
                self.next_index = slots::upcoming_slot_index(&self.slots, wall);
                self.next_due = self
                    .next_index
                    .map(|idx| slots::next_occurrence(&self.slots[idx], wall, true));
            }
        }
    }

    fn set_current(&mut self, idx: usize, started: NaiveDateTime) {
        let next = (idx + 1) % self.slots.len();
        self.current_index = Some(idx);
        self.next_index = Some(next);
        // A later slot tied on start time is due at the same instant
        self.next_due = Some(slots::next_occurrence(&self.slots[next], started, next > idx));
        self.no_next_reported = false;
    }

    /// Promote the next slot if its due instant has passed.
    fn advance_slot(&mut self, wall: NaiveDateTime) {
        let (Some(next), Some(due)) = (self.next_index, self.next_due) else {
            if !self.no_next_reported {
                if self.config.debug {
                    log_debug!("No next slot, skipping slot advancement");
                }
                self.no_next_reported = true;
            }
            return;
        };

        if wall > due {
            self.set_current(next, due);
        }
    }

    fn refresh_daily_events(&mut self, date: NaiveDate) {
        let window = DayWindow::for_date(
            date,
            &self.config.zone,
            self.config.day_start_margin,
            self.config.day_end_margin,
        );
        self.daily_events = events::select_daily(&self.events, &window);
        self.daily_events_date = Some(date);
    }

    fn refresh_active_events(&mut self, now: DateTime<Utc>) {
        self.active_events = events::select_active(&self.daily_events, now);
    }
}

fn sorted_arcs(mut slots: Vec<ScheduleSlot>) -> Vec<Arc<ScheduleSlot>> {
    slots::sort_slots(&mut slots);
    slots.into_iter().map(Arc::new).collect()
}
