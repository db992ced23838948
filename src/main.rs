//! Main application entry point.
//!
//! Parses the command line and dispatches to the agent, a one-shot command or the
//! simulation. Everything else lives in the library.

use anyhow::Result;

use kenban::args::{CliAction, ParsedArgs};
use kenban::commands::{
    control::{ControlCommand, handle_control_command},
    help, simulate, status,
};
use kenban::common::constants::EXIT_FAILURE;
use kenban::config;
use kenban::{Kenban, log_end, log_error_exit};

fn main() {
    if let Err(e) = run() {
        log_error_exit!("{}", e);
        // The chain carries the underlying cause (file, parse position, errno)
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        log_end!();
        std::process::exit(EXIT_FAILURE);
    }
}

fn run() -> Result<()> {
    let parsed = ParsedArgs::from_env();

    match parsed.action {
        CliAction::ShowVersion => help::display_version_info(),
        CliAction::ShowHelp => help::display_help(),
        CliAction::ShowHelpDueToError => {
            help::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Help { command } => help::run_help_command(command.as_deref()),
        CliAction::Run {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            Kenban::new(debug_enabled).run()?;
        }
        CliAction::Status {
            debug_enabled,
            at,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            status::handle_status_command(at.as_deref(), debug_enabled)?;
        }
        CliAction::Reload {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            handle_control_command(ControlCommand::Reload, debug_enabled)?;
        }
        CliAction::Redraw {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            handle_control_command(ControlCommand::Redraw, debug_enabled)?;
        }
        CliAction::Stop {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            handle_control_command(ControlCommand::Stop, debug_enabled)?;
        }
        CliAction::Simulate {
            debug_enabled,
            start_time,
            end_time,
            multiplier,
            log_to_file,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            simulate::handle_simulate_command(
                &start_time,
                &end_time,
                multiplier,
                debug_enabled,
                log_to_file,
            )?;
        }
    }

    Ok(())
}
