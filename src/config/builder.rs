//! Default configuration file generation.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::common::constants::*;
use crate::common::utils::private_path;

/// Write the commented default `kenban.toml` to `path`.
///
/// The file is written to a temporary sibling and renamed into place, so a crash
/// never leaves a half-written config behind.
pub fn create_default_config(path: &Path) -> Result<()> {
    let parent = path
        .parent()
        .context("Config path has no parent directory")?;
    fs::create_dir_all(parent).context("Failed to create config directory")?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .context("Failed to create temporary config file")?;
    temp.write_all(default_config_content().as_bytes())
        .context("Failed to write default config")?;
    temp.persist(path)
        .with_context(|| format!("Failed to save config to {}", private_path(path)))?;

    log_block_start!("Created default configuration: {}", private_path(path));
    Ok(())
}

/// The default configuration text.
pub fn default_config_content() -> String {
    ConfigBuilder::new()
        .add_section("Store")
        .add_setting(
            "watch_store",
            &DEFAULT_WATCH_STORE.to_string(),
            "Reload as soon as the schedule store changes",
        )
        .add_commented_setting(
            "store_path",
            "\"~/.local/share/kenban/schedule.json\"",
            "Schedule written by the sync service (default shown)",
        )
        .add_section("Schedule")
        .add_setting(
            "timezone",
            &format!("\"{DEFAULT_TIMEZONE}\""),
            "\"local\" or an IANA name such as \"Europe/London\"",
        )
        .add_setting(
            "day_start_margin_minutes",
            &DEFAULT_DAY_START_MARGIN_MINUTES.to_string(),
            &format!(
                "Event window opens this long before midnight (0-{MAXIMUM_DAY_MARGIN_MINUTES})"
            ),
        )
        .add_setting(
            "day_end_margin_minutes",
            &DEFAULT_DAY_END_MARGIN_MINUTES.to_string(),
            &format!(
                "Event window closes this long after 23:00 (0-{MAXIMUM_DAY_MARGIN_MINUTES})"
            ),
        )
        .add_section("Driving loop")
        .add_setting(
            "tick_interval_ms",
            &DEFAULT_TICK_INTERVAL_MS.to_string(),
            &format!(
                "How often the schedule is re-evaluated ({MINIMUM_TICK_INTERVAL_MS}-{MAXIMUM_TICK_INTERVAL_MS})ms"
            ),
        )
        .add_setting(
            "empty_schedule_delay_secs",
            &DEFAULT_EMPTY_SCHEDULE_DELAY_SECS.to_string(),
            &format!(
                "Idle time while nothing is scheduled (0-{MAXIMUM_EMPTY_SCHEDULE_DELAY_SECS})s"
            ),
        )
        .build()
}

/// Builds TOML with comments aligned in one column.
struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    /// A setting shown but left commented out, so its default stays computed.
    fn add_commented_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("# {key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !result.is_empty() {
                        result.push(String::new());
                    }
                    result.push(title);
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }
        result.push(String::new());
        result.join("\n")
    }
}
