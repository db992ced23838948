//! Event filtering: the per-day cache and the strict activation test.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::common::constants::DAILY_WINDOW_END_HOUR;
use crate::schedule::Event;
use crate::time::zone::Zone;

/// The span of instants whose events can matter on a given wall-clock day.
///
/// Runs from local midnight minus `start_margin` to 23:00 plus `end_margin`. The
/// margins over-fetch on purpose so events near midnight survive DST and offset
/// changes; activation is decided separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate, zone: &Zone, start_margin: Duration, end_margin: Duration) -> Self {
        let end_hour = NaiveTime::from_hms_opt(DAILY_WINDOW_END_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
        Self {
            start: zone.to_instant(date.and_time(NaiveTime::MIN)) - start_margin,
            end: zone.to_instant(date.and_time(end_hour)) + end_margin,
        }
    }

    /// In progress when the window opens, or starting inside it.
    pub fn admits(&self, event: &Event) -> bool {
        let spans_start = event.event_start < self.start && event.event_end > self.start;
        let starts_within = self.start <= event.event_start && event.event_start < self.end;
        spans_start || starts_within
    }
}

/// Events that could be active at some point of the window's day, in list order.
pub fn select_daily(events: &[Event], window: &DayWindow) -> Vec<Event> {
    events.iter().filter(|e| window.admits(e)).cloned().collect()
}

/// Events active at `now` (strictly inside their span), in list order.
pub fn select_active(events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
    events.iter().filter(|e| e.is_active_at(now)).cloned().collect()
}

/// Drop events that ended at or before `now`.
pub fn prune_ended(events: Vec<Event>, now: DateTime<Utc>) -> Vec<Event> {
    events.into_iter().filter(|e| !e.has_ended(now)).collect()
}
