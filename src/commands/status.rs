//! Status command: evaluate the schedule once and print the result as JSON.
//!
//! Runs the same engine the agent runs, against the configured store, pinned to
//! now or to the wall-clock time given with `--at`. Nothing is drawn and no running
//! instance is needed.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;

use crate::config::{Config, SchedulerConfig};
use crate::logger::Log;
use crate::render::DisplayContent;
use crate::schedule::{JsonFileStore, SlotStore};
use crate::scheduler::{ScheduleSnapshot, Scheduler};
use crate::time::source::{ManualTimeSource, RealTimeSource, TimeSource};
use crate::time::zone::Zone;

/// Everything `kenban status` prints.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub store: String,
    pub slot_count: usize,
    pub event_count: usize,
    pub daily_event_count: usize,
    #[serde(flatten)]
    pub snapshot: Arc<ScheduleSnapshot>,
    pub content: DisplayContent,
}

/// Parse `--at` as a wall-clock time in `zone`.
pub fn parse_at(text: &str, zone: &Zone) -> Result<chrono::DateTime<chrono::Utc>> {
    let wall = NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Invalid time '{text}', expected YYYY-MM-DD HH:MM:SS"))?;
    Ok(zone.to_instant(wall))
}

/// Evaluate `store` once at the clock's current instant.
pub fn build_status_report(
    store: Box<dyn SlotStore>,
    clock: Arc<dyn TimeSource>,
    config: SchedulerConfig,
) -> Result<StatusReport> {
    let store_name = store.describe();
    let scheduler = Scheduler::new(store, clock, config)?;
    let snapshot = scheduler.snapshot();

    Ok(StatusReport {
        store: store_name,
        slot_count: scheduler.slots().len(),
        event_count: scheduler.events().len(),
        daily_event_count: scheduler.daily_events().len(),
        content: DisplayContent::resolve(&snapshot),
        snapshot,
    })
}

/// Handle `kenban status [--at TIME]`.
pub fn handle_status_command(at: Option<&str>, debug_enabled: bool) -> Result<()> {
    // Keep stdout clean for the JSON unless debugging
    Log::set_enabled(debug_enabled);

    let config = Config::load()?;
    let scheduler_config = config.scheduler_config(debug_enabled)?;
    let clock: Arc<dyn TimeSource> = match at {
        Some(text) => Arc::new(ManualTimeSource::new(parse_at(text, &scheduler_config.zone)?)),
        None => Arc::new(RealTimeSource),
    };

    let store = JsonFileStore::new(config.store_path()?);
    let report = build_status_report(Box::new(store), clock, scheduler_config)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
