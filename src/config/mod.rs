//! Configuration for the kenban agent.
//!
//! Settings live in `kenban.toml`, by default under `$XDG_CONFIG_HOME/kenban/`. A
//! commented default file is written on first start. Every field is optional:
//!
//! ```toml
//! #[Store]
//! store_path = "~/.local/share/kenban/schedule.json" # Schedule written by the sync service
//! watch_store = true                                  # Reload as soon as the store changes
//!
//! #[Schedule]
//! timezone = "local"              # "local" or an IANA name such as "Europe/London"
//! day_start_margin_minutes = 120  # Event window opens this long before midnight (0-1440)
//! day_end_margin_minutes = 180    # Event window closes this long after 23:00 (0-1440)
//!
//! #[Driving loop]
//! tick_interval_ms = 200          # How often the schedule is re-evaluated (10-5000)ms
//! empty_schedule_delay_secs = 5   # Idle time while nothing is scheduled (0-300)s
//! ```
//!
//! The engine never reads this file. It is handed a [`SchedulerConfig`], the typed view
//! of the scheduling settings, when constructed.

pub mod builder;
pub mod loading;
pub mod validation;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::constants::*;
use crate::common::utils::private_path;
use crate::time::zone::Zone;

pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};

/// Settings from `kenban.toml`. `None` means "use the default".
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Path of the JSON schedule store; `~/` is expanded
    pub store_path: Option<String>,
    /// Follow store writes with a file watcher instead of waiting for the marker poll
    pub watch_store: Option<bool>,
    /// Timezone the weekly slots are read in
    pub timezone: Option<String>,
    pub day_start_margin_minutes: Option<u32>,
    pub day_end_margin_minutes: Option<u32>,
    pub tick_interval_ms: Option<u64>,
    pub empty_schedule_delay_secs: Option<u64>,
}

/// Scheduling settings handed to the engine at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Timezone slot times and "today" are read in
    pub zone: Zone,
    /// How far before local midnight the daily event window opens
    pub day_start_margin: chrono::Duration,
    /// How far after 23:00 local the daily event window closes
    pub day_end_margin: chrono::Duration,
    pub debug: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            zone: Zone::Local,
            day_start_margin: chrono::Duration::minutes(DEFAULT_DAY_START_MARGIN_MINUTES as i64),
            day_end_margin: chrono::Duration::minutes(DEFAULT_DAY_END_MARGIN_MINUTES as i64),
            debug: false,
        }
    }
}

impl SchedulerConfig {
    /// Defaults with an explicit zone.
    pub fn with_zone(zone: Zone) -> Self {
        Self {
            zone,
            ..Self::default()
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load()
    }

    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        load_from_path(path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        get_config_path()
    }

    pub fn zone(&self) -> Result<Zone> {
        Zone::parse(self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE))
    }

    /// Store location, defaulting to `<data-dir>/kenban/schedule.json`.
    pub fn store_path(&self) -> Result<PathBuf> {
        match self.store_path.as_deref() {
            Some(path) => Ok(loading::expand_tilde(path)),
            None => {
                let data_dir = dirs::data_dir().context("Could not determine data directory")?;
                Ok(data_dir.join("kenban").join(DEFAULT_STORE_FILE))
            }
        }
    }

    pub fn watch_store(&self) -> bool {
        self.watch_store.unwrap_or(DEFAULT_WATCH_STORE)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.unwrap_or(DEFAULT_TICK_INTERVAL_MS))
    }

    pub fn empty_schedule_delay(&self) -> Duration {
        Duration::from_secs(
            self.empty_schedule_delay_secs
                .unwrap_or(DEFAULT_EMPTY_SCHEDULE_DELAY_SECS),
        )
    }

    /// The engine's view of these settings.
    pub fn scheduler_config(&self, debug: bool) -> Result<SchedulerConfig> {
        let start = self
            .day_start_margin_minutes
            .unwrap_or(DEFAULT_DAY_START_MARGIN_MINUTES);
        let end = self
            .day_end_margin_minutes
            .unwrap_or(DEFAULT_DAY_END_MARGIN_MINUTES);
        Ok(SchedulerConfig {
            zone: self.zone()?,
            day_start_margin: chrono::Duration::minutes(start as i64),
            day_end_margin: chrono::Duration::minutes(end as i64),
            debug,
        })
    }

    pub fn log_config(&self) {
        let source = get_config_path()
            .map(|p| private_path(&p))
            .unwrap_or_else(|_| "defaults".to_string());
        log_block_start!("Loaded configuration from {}", source);

        match self.store_path() {
            Ok(path) => log_indented!("Store: {}", private_path(&path)),
            Err(e) => log_indented!("Store: unresolved ({e})"),
        }
        log_indented!(
            "Watch store: {}",
            if self.watch_store() { "yes" } else { "no" }
        );
        log_indented!(
            "Timezone: {}",
            self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE)
        );
        log_indented!(
            "Event window margins: -{}m / +{}m",
            self.day_start_margin_minutes
                .unwrap_or(DEFAULT_DAY_START_MARGIN_MINUTES),
            self.day_end_margin_minutes
                .unwrap_or(DEFAULT_DAY_END_MARGIN_MINUTES)
        );
        log_indented!("Tick interval: {}ms", self.tick_interval().as_millis());
        log_indented!(
            "Empty schedule delay: {}s",
            self.empty_schedule_delay().as_secs()
        );
    }
}
