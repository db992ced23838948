//! Control commands that signal the running instance: `reload`, `redraw`, `stop`.

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::time::Duration;

use crate::common::utils;
use crate::io::lock;

/// What to ask the running instance to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Reload,
    Redraw,
    Stop,
}

impl ControlCommand {
    pub fn signal(self) -> Signal {
        match self {
            ControlCommand::Reload => Signal::SIGUSR2,
            ControlCommand::Redraw => Signal::SIGUSR1,
            ControlCommand::Stop => Signal::SIGTERM,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ControlCommand::Reload => "reload",
            ControlCommand::Redraw => "redraw",
            ControlCommand::Stop => "termination",
        }
    }
}

/// How long `stop` waits for the instance to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Send `command` to the running kenban instance.
pub fn handle_control_command(command: ControlCommand, debug_enabled: bool) -> Result<()> {
    log_version!();

    let Some(pid) = lock::running_instance_pid() else {
        log_error_exit!("kenban isn't running");
        return Ok(());
    };

    kill(Pid::from_raw(pid as i32), command.signal())
        .with_context(|| format!("Failed to send {} signal to PID {pid}", command.describe()))?;
    log_block_start!("Sent {} signal to kenban (PID: {pid})", command.describe());
    if debug_enabled {
        log_pipe!();
        log_debug!("{} sent to process {}", command.signal(), pid);
    }

    if command == ControlCommand::Stop {
        wait_for_exit(pid);
    }

    log_end!();
    Ok(())
}

fn wait_for_exit(pid: u32) {
    let started = std::time::Instant::now();
    while started.elapsed() < STOP_TIMEOUT {
        if !utils::is_process_running(pid) {
            log_pipe!();
            log_info!("Process terminated successfully");
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    log_pipe!();
    log_warning!("Process did not terminate within the expected time");
    log_indented!("The termination signal was sent, but the process may still be shutting down");
}
