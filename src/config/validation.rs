//! Configuration validation.

use anyhow::{Context, Result};

use super::Config;
use crate::common::constants::*;
use crate::time::zone::Zone;

/// Reject out-of-range values and unknown timezones.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(interval) = config.tick_interval_ms
        && !(MINIMUM_TICK_INTERVAL_MS..=MAXIMUM_TICK_INTERVAL_MS).contains(&interval)
    {
        anyhow::bail!(
            "tick_interval_ms ({}) must be between {} and {} milliseconds",
            interval,
            MINIMUM_TICK_INTERVAL_MS,
            MAXIMUM_TICK_INTERVAL_MS
        );
    }

    for (name, value) in [
        ("day_start_margin_minutes", config.day_start_margin_minutes),
        ("day_end_margin_minutes", config.day_end_margin_minutes),
    ] {
        if let Some(minutes) = value
            && minutes > MAXIMUM_DAY_MARGIN_MINUTES
        {
            anyhow::bail!(
                "{} ({}) must be between 0 and {} minutes",
                name,
                minutes,
                MAXIMUM_DAY_MARGIN_MINUTES
            );
        }
    }

    if let Some(delay) = config.empty_schedule_delay_secs
        && delay > MAXIMUM_EMPTY_SCHEDULE_DELAY_SECS
    {
        anyhow::bail!(
            "empty_schedule_delay_secs ({}) must be between 0 and {} seconds",
            delay,
            MAXIMUM_EMPTY_SCHEDULE_DELAY_SECS
        );
    }

    if let Some(ref timezone) = config.timezone {
        Zone::parse(timezone).context("Invalid timezone in config")?;
    }

    if let Some(ref path) = config.store_path
        && path.trim().is_empty()
    {
        anyhow::bail!("store_path must not be empty");
    }

    Ok(())
}
