//! Command-line command handlers for kenban.
//!
//! One-shot commands (status, reload, redraw, stop, help) and the simulation
//! entry point. Each command lives in its own submodule.

pub mod control;
pub mod help;
pub mod simulate;
pub mod status;
