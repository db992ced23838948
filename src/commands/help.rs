//! Help command implementation for kenban.
//!
//! Dispatches `kenban help [COMMAND]` to general or command-specific help.

/// Run the help command (dispatcher)
pub fn run_help_command(command: Option<&str>) {
    match command {
        None => display_help(),
        Some("status") => display_status_help(),
        Some("reload" | "r") => display_control_help(
            "reload",
            "Reload the schedule store now",
            "Sends SIGUSR2 to the running kenban instance, which re-reads the store",
            "and redraws if anything visible changed.",
        ),
        Some("redraw") => display_control_help(
            "redraw",
            "Redraw the current content",
            "Sends SIGUSR1 to the running kenban instance, which redraws the",
            "current slot even though nothing changed.",
        ),
        Some("stop") => display_control_help(
            "stop",
            "Stop the running instance",
            "Sends SIGTERM to the running kenban instance and waits for it to exit.",
            "The instance releases its lock file on the way out.",
        ),
        Some("help" | "h") => display_help_help(),
        Some(unknown) => {
            log_warning!("Unknown command: {}", unknown);
            display_help();
        }
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays the general help message.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("kenban [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-S, --simulate         Run the schedule against simulated time");
    log_indented!("                       Usage: --simulate <start> <end> [multiplier | ff] [--log]");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("status [--at <time>]   Print what is (or would be) on screen as JSON");
    log_indented!("reload, r              Make the running instance reload its store");
    log_indented!("redraw                 Make the running instance redraw");
    log_indented!("stop                   Stop the running instance");
    log_indented!("help, h [COMMAND]      Show detailed help for a command");
    log_end!();
}

fn display_status_help() {
    log_version!();
    log_block_start!("status - Show the current schedule state");
    log_block_start!("Usage: kenban status [--at \"YYYY-MM-DD HH:MM:SS\"]");
    log_block_start!("Description:");
    log_indented!("Loads the configured store, evaluates it once and prints the current");
    log_indented!("slot, the next slot, the active events and the resolved screen content");
    log_indented!("as JSON. With --at the evaluation happens at that wall-clock time in");
    log_indented!("the configured timezone instead of now.");
    log_block_start!("Examples:");
    log_indented!("kenban status");
    log_indented!("kenban status --at \"2024-01-01 09:30:00\"");
    log_end!();
}

fn display_control_help(name: &str, summary: &str, line1: &str, line2: &str) {
    log_version!();
    log_block_start!("{} - {}", name, summary);
    log_block_start!("Usage: kenban {}", name);
    log_block_start!("Description:");
    log_indented!("{}", line1);
    log_indented!("{}", line2);
    log_end!();
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: kenban help [COMMAND]");
    log_block_start!("Arguments:");
    log_indented!("COMMAND  Optional command to get help for");
    log_indented!("         If omitted, shows general help");
    log_end!();
}
