//! Published engine state for readers on other threads.
//!
//! The engine builds a complete [`ScheduleSnapshot`] after each operation and swaps it
//! in behind an `RwLock<Arc<_>>`. Readers clone the `Arc` and never see a snapshot
//! whose slot and events come from different evaluations.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::schedule::{Event, ScheduleSlot};

/// What should be on screen, as of `evaluated_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleSnapshot {
    pub evaluated_at: DateTime<Utc>,
    /// `evaluated_at` in the schedule's timezone
    pub wall_clock: NaiveDateTime,
    pub current_slot: Option<Arc<ScheduleSlot>>,
    pub next_slot: Option<Arc<ScheduleSlot>>,
    /// Wall-clock time at which `next_slot` takes over
    pub next_slot_due: Option<NaiveDateTime>,
    pub active_events: Vec<Event>,
    pub event_active: bool,
}

impl ScheduleSnapshot {
    pub fn empty(evaluated_at: DateTime<Utc>, wall_clock: NaiveDateTime) -> Self {
        Self {
            evaluated_at,
            wall_clock,
            current_slot: None,
            next_slot: None,
            next_slot_due: None,
            active_events: Vec::new(),
            event_active: false,
        }
    }

    /// The event a single-event display should show: the first active one.
    pub fn primary_event(&self) -> Option<&Event> {
        self.active_events.first()
    }
}

/// Latest snapshot plus the redraw flag, shared between engine and renderer.
#[derive(Debug)]
pub struct SharedSchedule {
    snapshot: RwLock<Arc<ScheduleSnapshot>>,
    refresh_needed: AtomicBool,
}

impl SharedSchedule {
    pub fn new(initial: ScheduleSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(initial)),
            refresh_needed: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> Arc<ScheduleSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Swap in a new snapshot, then raise the redraw flag if asked.
    ///
    /// The flag is set after the swap so a reader that sees it also sees the data.
    pub fn publish(&self, snapshot: ScheduleSnapshot, refresh: bool) {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(snapshot);
        if refresh {
            self.refresh_needed.store(true, Ordering::Release);
        }
    }

    pub fn refresh_needed(&self) -> bool {
        self.refresh_needed.load(Ordering::Acquire)
    }

    pub fn request_refresh(&self) {
        self.refresh_needed.store(true, Ordering::Release);
    }

    /// Acknowledge a redraw. Returns whether a refresh was pending.
    pub fn clear_refresh_needed(&self) -> bool {
        self.refresh_needed.swap(false, Ordering::AcqRel)
    }
}
