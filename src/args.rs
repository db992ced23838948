//! Command-line argument parsing and processing.
//!
//! Supports the standard help, version, debug and config-directory flags, the
//! `--simulate` flag, and the `status`, `reload`, `redraw`, `stop` and `help`
//! subcommands.

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the agent
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Print what would be on screen (now, or at `at`) as JSON and exit
    Status {
        debug_enabled: bool,
        at: Option<String>,
        config_dir: Option<String>,
    },
    /// Ask the running instance to reload its store (SIGUSR2)
    Reload {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Ask the running instance to redraw (SIGUSR1)
    Redraw {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Stop the running instance (SIGTERM)
    Stop {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Run the driving loop against a simulated clock
    Simulate {
        debug_enabled: bool,
        start_time: String,
        end_time: String,
        /// Simulated seconds per real second; 0 = fast-forward
        multiplier: f64,
        log_to_file: bool,
        config_dir: Option<String>,
    },
    /// Help for one command, or general help
    Help { command: Option<String> },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Default simulation speed: one simulated hour per real second.
pub const DEFAULT_SIMULATION_MULTIPLIER: f64 = 3600.0;

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

/// Basic `YYYY-MM-DD HH:MM:SS` shape check; full parsing happens in the command.
fn looks_like_datetime(s: &str) -> bool {
    s.len() == 19
        && s.chars().nth(4) == Some('-')
        && s.chars().nth(7) == Some('-')
        && s.chars().nth(10) == Some(' ')
        && s.chars().nth(13) == Some(':')
        && s.chars().nth(16) == Some(':')
}

/// Parse a simulation speed: `ff`/`0`/`--fast-forward` mean fast-forward.
fn parse_multiplier(value: &str) -> Option<f64> {
    match value {
        "ff" | "--fast-forward" => Some(0.0),
        _ => match value.parse::<f64>() {
            Ok(mult) if mult == 0.0 => Some(0.0),
            Ok(mult) if (0.1..=86_400.0).contains(&mult) => Some(mult),
            _ => None,
        },
    }
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// The first element of `args` is the program name and is skipped.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut unknown_arg_found = false;
        let mut config_dir: Option<String> = None;
        let mut command: Option<String> = None;
        let mut command_args: Vec<String> = Vec::new();
        let mut run_simulate = false;
        let mut simulate_start: Option<String> = None;
        let mut simulate_end: Option<String> = None;
        let mut simulate_multiplier = DEFAULT_SIMULATION_MULTIPLIER;
        let mut log_to_file = false;
        let mut status_at: Option<String> = None;

        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut i = 0;
        while i < args_vec.len() {
            let arg_str = &args_vec[i];
            match arg_str.as_str() {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--config" | "-c" => {
                    // Parse: --config <directory>
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        config_dir = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing directory for --config. Usage: --config <directory>");
                        unknown_arg_found = true;
                    }
                }
                "--at" if command.as_deref() == Some("status") => {
                    if i + 1 < args_vec.len() && looks_like_datetime(&args_vec[i + 1]) {
                        status_at = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("--at expects a time as \"YYYY-MM-DD HH:MM:SS\"");
                        unknown_arg_found = true;
                    }
                }
                "--simulate" | "-S" => {
                    run_simulate = true;
                    // Parse: --simulate <start> <end> [multiplier | ff] [--log]
                    if i + 2 < args_vec.len() {
                        let start_str = &args_vec[i + 1];
                        let end_str = &args_vec[i + 2];
                        if !looks_like_datetime(start_str) {
                            log_error!(
                                "Invalid start time format: '{}'. Use YYYY-MM-DD HH:MM:SS",
                                start_str
                            );
                            unknown_arg_found = true;
                        } else if !looks_like_datetime(end_str) {
                            log_error!(
                                "Invalid end time format: '{}'. Use YYYY-MM-DD HH:MM:SS",
                                end_str
                            );
                            unknown_arg_found = true;
                        } else {
                            simulate_start = Some(start_str.clone());
                            simulate_end = Some(end_str.clone());
                        }
                        i += 2;

                        if let Some(next) = args_vec.get(i + 1)
                            && next != "--log"
                            && (!next.starts_with('-') || next == "--fast-forward")
                        {
                            match parse_multiplier(next) {
                                Some(mult) => simulate_multiplier = mult,
                                None => {
                                    log_error!(
                                        "Invalid multiplier: {}. Use 0/ff for fast-forward or 0.1 to 86400.",
                                        next
                                    );
                                    unknown_arg_found = true;
                                }
                            }
                            i += 1;
                        }

                        if args_vec.get(i + 1).is_some_and(|next| next == "--log") {
                            log_to_file = true;
                            i += 1;
                        }
                    } else {
                        log_warning!(
                            "Missing arguments for --simulate. Usage: --simulate \"YYYY-MM-DD HH:MM:SS\" \"YYYY-MM-DD HH:MM:SS\" [multiplier | ff] [--log]"
                        );
                        unknown_arg_found = true;
                    }
                }
                _ => {
                    if arg_str.starts_with('-') {
                        log_warning!("Unknown option: {arg_str}");
                        unknown_arg_found = true;
                    } else if command.is_none() {
                        command = Some(arg_str.clone());
                    } else {
                        command_args.push(arg_str.clone());
                    }
                }
            }
            i += 1;
        }

        let action = if display_version {
            CliAction::ShowVersion
        } else if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else if display_help {
            match command {
                // `kenban status --help` reads as `kenban help status`
                Some(cmd) if cmd != "help" => CliAction::Help { command: Some(cmd) },
                _ => CliAction::ShowHelp,
            }
        } else if run_simulate {
            match (simulate_start, simulate_end) {
                (Some(start), Some(end)) if command.is_none() => CliAction::Simulate {
                    debug_enabled,
                    start_time: start,
                    end_time: end,
                    multiplier: simulate_multiplier,
                    log_to_file,
                    config_dir,
                },
                (Some(_), Some(_)) => {
                    log_warning!("--simulate cannot be combined with a command");
                    CliAction::ShowHelpDueToError
                }
                _ => {
                    log_warning!("Missing start or end time for --simulate");
                    CliAction::ShowHelpDueToError
                }
            }
        } else {
            match command.as_deref() {
                None => CliAction::Run {
                    debug_enabled,
                    config_dir,
                },
                Some("status") => CliAction::Status {
                    debug_enabled,
                    at: status_at,
                    config_dir,
                },
                Some("reload" | "r") => CliAction::Reload {
                    debug_enabled,
                    config_dir,
                },
                Some("redraw") => CliAction::Redraw {
                    debug_enabled,
                    config_dir,
                },
                Some("stop") => CliAction::Stop {
                    debug_enabled,
                    config_dir,
                },
                Some("help" | "h") => CliAction::Help {
                    command: command_args.into_iter().next(),
                },
                Some(unknown) => {
                    log_warning!("Unknown command: {}", unknown);
                    CliAction::ShowHelpDueToError
                }
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliAction {
        let mut full = vec!["kenban"];
        full.extend_from_slice(args);
        ParsedArgs::parse(full).action
    }

    #[test]
    fn test_parse_no_args() {
        assert_eq!(
            parse(&[]),
            CliAction::Run {
                debug_enabled: false,
                config_dir: None
            }
        );
    }

    #[test]
    fn test_parse_debug_and_config() {
        assert_eq!(
            parse(&["-d", "--config", "/etc/kenban"]),
            CliAction::Run {
                debug_enabled: true,
                config_dir: Some("/etc/kenban".to_string())
            }
        );
    }

    #[test]
    fn test_parse_help_and_version() {
        assert_eq!(parse(&["--help"]), CliAction::ShowHelp);
        assert_eq!(parse(&["-V"]), CliAction::ShowVersion);
        // Version takes precedence
        assert_eq!(parse(&["--help", "--version"]), CliAction::ShowVersion);
    }

    #[test]
    fn test_parse_unknown_flag() {
        assert_eq!(parse(&["--bogus"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["--config"]), CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_status_with_time() {
        assert_eq!(
            parse(&["status", "--at", "2024-01-01 10:00:00"]),
            CliAction::Status {
                debug_enabled: false,
                at: Some("2024-01-01 10:00:00".to_string()),
                config_dir: None
            }
        );
        assert_eq!(parse(&["status", "--at", "tomorrow"]), CliAction::ShowHelpDueToError);
        // --at only belongs to status
        assert_eq!(parse(&["--at", "2024-01-01 10:00:00"]), CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_control_commands() {
        assert!(matches!(parse(&["reload"]), CliAction::Reload { .. }));
        assert!(matches!(parse(&["redraw"]), CliAction::Redraw { .. }));
        assert!(matches!(
            parse(&["--debug", "stop"]),
            CliAction::Stop {
                debug_enabled: true,
                ..
            }
        ));
        assert_eq!(parse(&["launch"]), CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_help_command() {
        assert_eq!(
            parse(&["help", "status"]),
            CliAction::Help {
                command: Some("status".to_string())
            }
        );
        assert_eq!(
            parse(&["status", "--help"]),
            CliAction::Help {
                command: Some("status".to_string())
            }
        );
        assert_eq!(parse(&["help"]), CliAction::Help { command: None });
    }

    #[test]
    fn test_parse_simulate_defaults() {
        assert_eq!(
            parse(&["--simulate", "2024-01-01 08:00:00", "2024-01-01 20:00:00"]),
            CliAction::Simulate {
                debug_enabled: false,
                start_time: "2024-01-01 08:00:00".to_string(),
                end_time: "2024-01-01 20:00:00".to_string(),
                multiplier: DEFAULT_SIMULATION_MULTIPLIER,
                log_to_file: false,
                config_dir: None
            }
        );
    }

    #[test]
    fn test_parse_simulate_fast_forward_and_log() {
        for ff in ["ff", "0", "--fast-forward"] {
            let action = parse(&[
                "-S",
                "2024-01-01 08:00:00",
                "2024-01-01 20:00:00",
                ff,
                "--log",
            ]);
            assert!(matches!(
                action,
                CliAction::Simulate {
                    log_to_file: true,
                    ..
                }
            ));
            if let CliAction::Simulate { multiplier, .. } = action {
                assert_eq!(multiplier, 0.0);
            }
        }
    }

    #[test]
    fn test_parse_simulate_rejects_bad_input() {
        assert_eq!(
            parse(&["--simulate", "2024-01-01", "2024-01-01 20:00:00"]),
            CliAction::ShowHelpDueToError
        );
        assert_eq!(
            parse(&["--simulate", "2024-01-01 08:00:00", "2024-01-01 20:00:00", "fast"]),
            CliAction::ShowHelpDueToError
        );
        assert_eq!(parse(&["--simulate", "2024-01-01 08:00:00"]), CliAction::ShowHelpDueToError);
    }
}
