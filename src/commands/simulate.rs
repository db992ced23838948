//! Implementation of the --simulate command.
//!
//! Runs the real driving loop against a [`SimulatedTimeSource`], so a day or a
//! week of schedule can be watched in seconds. Start and end are wall-clock
//! times in the configured timezone.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;

use crate::commands::status::parse_at;
use crate::common::utils::format_duration;
use crate::config::Config;
use crate::io::lock::running_instance_pid;
use crate::kenban::Kenban;
use crate::logger::Log;
use crate::time::source::SimulatedTimeSource;

/// Handle `kenban --simulate START END [MULT] [--log]`.
///
/// `multiplier` is simulated seconds per real second; 0 means fast-forward.
pub fn handle_simulate_command(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    debug_enabled: bool,
    log_to_file: bool,
) -> Result<()> {
    log_version!();
    log_block_start!("Simulation Mode");

    if let Some(pid) = running_instance_pid() {
        log_pipe!();
        log_error!("Cannot run simulation: kenban is already running (PID: {})", pid);
        log_indented!("Stop the existing instance first with: kenban stop");
        log_end!();
        return Ok(());
    }

    let config = Config::load()?;
    let zone = config.zone()?;
    let start = parse_at(start_time, &zone)?;
    let end = parse_at(end_time, &zone)?;
    if end <= start {
        anyhow::bail!("End time must be after start time");
    }

    log_simulation_details(start_time, end_time, start, end, multiplier);

    let _logger_guard = if log_to_file {
        let log_filename = format!(
            "kenban-simulation-{}.log",
            Local::now().format("%Y%m%d-%H%M%S")
        );
        log_block_start!("Logging simulation output to: {}", log_filename);
        Some(Log::start_file_logging(log_filename)?)
    } else {
        None
    };

    let clock = Arc::new(SimulatedTimeSource::new(start, end, multiplier));
    Kenban::new(debug_enabled)
        .without_lock()
        .without_headers()
        .with_clock(clock)
        .run()
}

fn log_simulation_details(
    display_start: &str,
    display_end: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    multiplier: f64,
) {
    let duration = end.signed_duration_since(start);

    log_decorated!("Simulating from {} to {}", display_start, display_end);
    log_indented!("Total simulated time: {}", format_duration(duration));

    if multiplier == 0.0 {
        log_indented!("Time acceleration: fast-forward (instant execution)");
    } else {
        let theoretical_secs = duration.num_milliseconds() as f64 / 1000.0 / multiplier;
        log_indented!(
            "Time acceleration: {}x (theoretical: ~{:.1} seconds)",
            multiplier,
            theoretical_secs
        );
        log_indented!("Note: Actual time may vary due to system and processing overhead");
    }
}
