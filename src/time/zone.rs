//! Wall-clock policy: which timezone the weekly schedule is read in.
//!
//! Slots are wall-clock times ("Monday 09:00") while events and the clock are
//! absolute instants. `Zone` is the single place where the two meet.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;

/// Timezone used to interpret slot times and "today".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
    /// The host's local timezone
    Local,
    /// An explicit IANA timezone
    Named(Tz),
}

impl Zone {
    /// Parse a configuration value: `"local"` (any case) or an IANA name like `"Europe/London"`.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        trimmed
            .parse::<Tz>()
            .map(Zone::Named)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Unknown timezone '{trimmed}'"))
    }

    /// Convert an absolute instant to wall-clock date and time in this zone.
    pub fn wall_clock(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Zone::Local => instant.with_timezone(&Local).naive_local(),
            Zone::Named(tz) => instant.with_timezone(tz).naive_local(),
        }
    }

    /// Convert a wall-clock date and time in this zone to an absolute instant.
    ///
    /// Ambiguous times (DST fold) map to the earliest instant. Times that do not
    /// exist (DST gap) are read one hour later, the width of every common gap.
    pub fn to_instant(&self, wall: NaiveDateTime) -> DateTime<Utc> {
        match self {
            Zone::Local => resolve_local(&Local, wall),
            Zone::Named(tz) => resolve_local(tz, wall),
        }
    }
}

fn resolve_local<Z: TimeZone>(zone: &Z, wall: NaiveDateTime) -> DateTime<Utc> {
    if let Some(resolved) = zone.from_local_datetime(&wall).earliest() {
        return resolved.with_timezone(&Utc);
    }
    let probe = wall + chrono::Duration::hours(1);
    match zone.from_local_datetime(&probe).earliest() {
        Some(resolved) => resolved.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&wall),
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => write!(f, "local"),
            Zone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}
