//! Schedule data model: recurring weekly slots and one-off events.
//!
//! Both types are plain values. The scheduler reloads whole collections of them and
//! compares collections structurally (`PartialEq`) to decide whether anything changed.
//! The derived `end_time` takes part in equality too; both sides of a comparison are
//! normalised by the same sort first.

pub mod store;
pub mod watcher;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::time::weekday::{END_OF_DAY, serde_instant, serde_time_of_day, serde_weekday};

pub use store::{JsonFileStore, MemoryStore, ModificationMarker, SlotStore};

/// A recurring weekly time window with display content.
///
/// Field aliases accept the sync layer's original column names (`uuid`,
/// `template_uuid`, `foreground_image_uuid`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    #[serde(alias = "uuid")]
    pub id: String,
    #[serde(alias = "template_uuid")]
    pub template_id: String,
    #[serde(default, alias = "foreground_image_uuid")]
    pub foreground_image_id: Option<String>,
    #[serde(default)]
    pub display_text: Option<String>,
    #[serde(default)]
    pub time_format: Option<String>,
    #[serde(with = "serde_time_of_day")]
    pub start_time: NaiveTime,
    #[serde(with = "serde_weekday")]
    pub weekday: Weekday,
    /// Start of the next slot on the same weekday, or 23:59:59 for the last one.
    /// Derived by `sort_slots`, never read from storage.
    #[serde(
        skip_deserializing,
        default = "end_of_day",
        serialize_with = "serde_time_of_day::serialize"
    )]
    pub end_time: NaiveTime,
}

fn end_of_day() -> NaiveTime {
    END_OF_DAY
}

impl ScheduleSlot {
    pub fn new(
        id: impl Into<String>,
        template_id: impl Into<String>,
        weekday: Weekday,
        start_time: NaiveTime,
    ) -> Self {
        Self {
            id: id.into(),
            template_id: template_id.into(),
            foreground_image_id: None,
            display_text: None,
            time_format: None,
            start_time,
            weekday,
            end_time: END_OF_DAY,
        }
    }

    pub fn with_display_text(mut self, text: impl Into<String>) -> Self {
        self.display_text = Some(text.into());
        self
    }

    pub fn with_foreground_image(mut self, image_id: impl Into<String>) -> Self {
        self.foreground_image_id = Some(image_id.into());
        self
    }

    /// Monday = 0 … Sunday = 6
    pub fn weekday_index(&self) -> u32 {
        self.weekday.num_days_from_monday()
    }
}

/// A one-off occurrence between two absolute instants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(alias = "uuid")]
    pub id: String,
    #[serde(default, alias = "foreground_image_uuid")]
    pub foreground_image_id: Option<String>,
    #[serde(default)]
    pub display_text: Option<String>,
    #[serde(with = "serde_instant")]
    pub event_start: DateTime<Utc>,
    #[serde(with = "serde_instant")]
    pub event_end: DateTime<Utc>,
    /// Whether the event replaces the slot's content instead of accompanying it.
    /// Interpreted by the display layer only.
    #[serde(default, rename = "override")]
    pub override_slot: bool,
}

impl Event {
    pub fn new(id: impl Into<String>, event_start: DateTime<Utc>, event_end: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            foreground_image_id: None,
            display_text: None,
            event_start,
            event_end,
            override_slot: false,
        }
    }

    pub fn with_display_text(mut self, text: impl Into<String>) -> Self {
        self.display_text = Some(text.into());
        self
    }

    pub fn overriding(mut self) -> Self {
        self.override_slot = true;
        self
    }

    /// Strictly inside `(event_start, event_end)`; both boundaries are inactive.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.event_start < now && now < self.event_end
    }

    /// Ended at or before `now`, so it can never become active again.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.event_end <= now
    }
}
