//! # kenban
//!
//! Library behind the kenban binary: a signage agent that keeps the active weekly
//! schedule slot, and any calendar events running right now, on screen.
//!
//! ## Architecture
//!
//! - **Entry Point**: [`Kenban`] acquires resources and starts the driving loop
//! - **Engine**: [`scheduler`] decides the current slot, the next slot and the active
//!   events for any instant; [`schedule`] holds the data model and store adapters
//! - **Driving loop**: [`core`] ticks the engine, reloads the store and redraws
//! - **Display**: [`render`] turns engine snapshots into screen content
//! - **Configuration**: [`config`] for TOML-based settings
//! - **Commands**: [`commands`] for the one-shot CLI subcommands and simulation
//! - **Infrastructure**: [`io`] for signals and the instance lock, [`time`] for
//!   clocks and timezones, plus logging and shared utilities

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod commands;
pub mod common;
pub mod config;
pub mod core;
pub mod io;
pub mod render;
pub mod schedule;
pub mod scheduler;
pub mod time;

// Internal modules
mod kenban;

pub use kenban::Kenban;
pub use render::{DisplayContent, Renderer};
pub use schedule::{Event, ScheduleSlot, SlotStore};
pub use scheduler::{ReloadOutcome, Scheduler};
