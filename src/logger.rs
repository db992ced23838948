//! Structured logging with kenban's box-drawing output style.
//!
//! Every message flows through [`emit`], which applies the runtime enable switch,
//! prepends the simulated-clock timestamp when one is registered, and routes the line
//! either to stdout or to the file logger thread started with [`Log::start_file_logging`].
//!
//! ## Conventions
//!
//! - **`log_block_start!`** opens a new conceptual block (`┃` spacer, then `┣ message`).
//!   Use it for state changes such as "Current slot changed" or "Schedule reloaded".
//! - **`log_decorated!`** continues a block (`┣ message`).
//! - **`log_indented!`** prints nested details under the previous line (`┃   message`).
//! - **`log_pipe!`** inserts an empty `┃` spacer before a semantic message that starts
//!   its own block. Never use it to close a block.
//! - **`log_version!`** / **`log_end!`** frame the whole session.
//! - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`** carry a
//!   coloured `[LEVEL]` tag for messages whose severity matters more than the layout.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, OnceLock};

use crate::time::source::TimeSource;
use crate::time::zone::Zone;

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

// Simulated clock used for timestamp prefixes; only registered in simulation mode
static SIMULATED_CLOCK: OnceLock<(Arc<dyn TimeSource>, Zone)> = OnceLock::new();

// Channel for routing output to file when --log is active
static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Logging control surface. The macros below do the actual formatting.
pub struct Log;

impl Log {
    /// Enable or disable logging, e.g. while `status` prints machine-readable output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Register the simulated clock so every line carries the simulated wall-clock time.
    ///
    /// Only the first registration wins; the process runs a single simulation.
    pub fn set_simulated_clock(clock: Arc<dyn TimeSource>, zone: Zone) {
        let _ = SIMULATED_CLOCK.set((clock, zone));
    }

    /// Start routing all output to `file_path` from a dedicated writer thread.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => {
                        file.write_all(text.as_bytes())?;
                    }
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix shown in simulation mode, `[YYYY-MM-DD HH:MM:SS] `.
    ///
    /// Empty when no simulated clock has been registered.
    pub fn timestamp_prefix() -> String {
        match SIMULATED_CLOCK.get() {
            Some((clock, zone)) => {
                let wall = zone.wall_clock(clock.now());
                format!("[{}] ", wall.format("%Y-%m-%d %H:%M:%S"))
            }
            None => String::new(),
        }
    }
}

/// Guard for file logging that flushes and joins the writer thread on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Route already formatted text to the file logger or stdout.
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

/// Emit one line: `lead` is the box-drawing or level tag placed before the message.
///
/// With `spacer` set an empty `┃` line is written first, which is how blocks open.
pub fn emit(lead: &str, message: &str, spacer: bool) {
    if !Log::is_enabled() {
        return;
    }
    let prefix = Log::timestamp_prefix();
    let formatted = if spacer {
        format!("{prefix}┃\n{prefix}{lead}{message}\n")
    } else {
        format!("{prefix}{lead}{message}\n")
    };
    write_output(&formatted);
}

// # Logging Macros

/// Log a decorated message as part of an existing block.
#[macro_export]
macro_rules! log_decorated {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::emit("┣ ", &format!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::logger::emit("┣ ", &format!("{}", $expr), false)
    };
}

/// Log an indented detail line.
#[macro_export]
macro_rules! log_indented {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::emit("┃   ", &format!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::logger::emit("┃   ", &format!("{}", $expr), false)
    };
}

/// Log an empty pipe spacer.
#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::logger::emit("┃", "", false)
    };
}

/// Open a new block of related messages.
#[macro_export]
macro_rules! log_block_start {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::emit("┣ ", &format!($fmt $($arg)*), true)
    };
    ($expr:expr) => {
        $crate::logger::emit("┣ ", &format!("{}", $expr), true)
    };
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::logger::emit(
            "┏ ",
            &format!("kenban v{} ━━╸", env!("CARGO_PKG_VERSION")),
            false,
        )
    };
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {
        $crate::logger::emit("╹", "", false)
    };
}

/// Log a warning with a yellow tag.
#[macro_export]
macro_rules! log_warning {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::emit("┣[\x1b[33mWARNING\x1b[0m] ", &format!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::logger::emit("┣[\x1b[33mWARNING\x1b[0m] ", &format!("{}", $expr), false)
    };
}

/// Log an error with a red tag.
#[macro_export]
macro_rules! log_error {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::emit("┣[\x1b[31mERROR\x1b[0m] ", &format!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::logger::emit("┣[\x1b[31mERROR\x1b[0m] ", &format!("{}", $expr), false)
    };
}

/// Log an error that terminates the flow (`┗` corner after a spacer).
#[macro_export]
macro_rules! log_error_exit {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::emit("┗[\x1b[31mERROR\x1b[0m] ", &format!($fmt $($arg)*), true)
    };
    ($expr:expr) => {
        $crate::logger::emit("┗[\x1b[31mERROR\x1b[0m] ", &format!("{}", $expr), true)
    };
}

/// Log an informational message with a green tag.
#[macro_export]
macro_rules! log_info {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::emit("┣[\x1b[32mINFO\x1b[0m] ", &format!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::logger::emit("┣[\x1b[32mINFO\x1b[0m] ", &format!("{}", $expr), false)
    };
}

/// Log a debug message with a green tag.
#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::emit("┣[\x1b[32mDEBUG\x1b[0m] ", &format!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::logger::emit("┣[\x1b[32mDEBUG\x1b[0m] ", &format!("{}", $expr), false)
    };
}

/// Log a critical message with a red tag.
#[macro_export]
macro_rules! log_critical {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::emit("┣[\x1b[31mCRITICAL\x1b[0m] ", &format!($fmt $($arg)*), false)
    };
    ($expr:expr) => {
        $crate::logger::emit("┣[\x1b[31mCRITICAL\x1b[0m] ", &format!("{}", $expr), false)
    };
}
