//! Weekday and time-of-day helpers.
//!
//! Pure conversions between the textual forms used by the sync layer ("Monday",
//! "09:00", "2024-01-01T10:00:00+00:00") and chrono values. Nothing here keeps state.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc, Weekday};

/// Weekday names in index order, Monday = 0 … Sunday = 6.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// The end time given to the last slot of a day.
pub const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 59) {
    Some(t) => t,
    None => NaiveTime::MIN,
};

/// Index of a weekday name, Monday = 0 … Sunday = 6 (case-insensitive).
///
/// Matches `chrono::Weekday::num_days_from_monday`, so indices compare directly
/// against today's weekday.
pub fn weekday_index(name: &str) -> Option<u32> {
    let name = name.trim();
    WEEKDAY_NAMES
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(name))
        .map(|idx| idx as u32)
}

pub fn parse_weekday(name: &str) -> Option<Weekday> {
    weekday_index(name).and_then(|idx| Weekday::try_from(idx as u8).ok())
}

pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAY_NAMES[day.num_days_from_monday() as usize]
}

/// Parse a time of day in `HH:MM` or `HH:MM:SS` form.
///
/// Never fails: anything unparseable logs a warning and becomes midnight.
pub fn parse_time_of_day(text: &str) -> NaiveTime {
    let trimmed = text.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .unwrap_or_else(|_| {
            log_warning!("Failed to parse time '{}', using 00:00:00", trimmed);
            NaiveTime::MIN
        })
}

/// Parse an absolute instant as written by the sync layer.
///
/// Accepts RFC 3339 (`2024-01-01T10:00:00+00:00`, `...Z`) and naive
/// `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS`, which are taken as UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Serde adapter storing a weekday by its full name.
pub mod serde_weekday {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(super::weekday_name(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let name = String::deserialize(deserializer)?;
        super::parse_weekday(&name).ok_or_else(|| D::Error::custom(format!("unknown weekday '{name}'")))
    }
}

/// Serde adapter for a time of day that fails soft to midnight.
pub mod serde_time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(super::parse_time_of_day(&text))
    }
}

/// Serde adapter for instants in any form accepted by [`parse_instant`].
pub mod serde_instant {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&instant.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_instant(&text).ok_or_else(|| D::Error::custom(format!("invalid instant '{text}'")))
    }
}
