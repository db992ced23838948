//! Default values and validation limits.
//!
//! Config fields are all optional; anything left out falls back to the defaults here.

// Store
pub const DEFAULT_STORE_FILE: &str = "schedule.json";
pub const DEFAULT_TIMEZONE: &str = "local";
pub const DEFAULT_WATCH_STORE: bool = true;

// Driving loop
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 200;
pub const MINIMUM_TICK_INTERVAL_MS: u64 = 10;
pub const MAXIMUM_TICK_INTERVAL_MS: u64 = 5000;

/// How long the loop idles while no slot is current.
pub const DEFAULT_EMPTY_SCHEDULE_DELAY_SECS: u64 = 5;
pub const MAXIMUM_EMPTY_SCHEDULE_DELAY_SECS: u64 = 300;

// Daily event window: [today 00:00 - start margin, today 23:00 + end margin]
pub const DEFAULT_DAY_START_MARGIN_MINUTES: u32 = 120;
pub const DEFAULT_DAY_END_MARGIN_MINUTES: u32 = 180;
pub const MAXIMUM_DAY_MARGIN_MINUTES: u32 = 1440;
pub const DAILY_WINDOW_END_HOUR: u32 = 23;

// Store watcher
pub const STORE_WATCH_DEBOUNCE_MS: u64 = 500;

// Exit codes
pub const EXIT_FAILURE: i32 = 1;
