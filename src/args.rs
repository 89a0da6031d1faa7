//! Command-line argument parsing.
//!
//! Parses the flag set into a [`CliAction`] so `main` stays a plain dispatch.
//! Unknown options and malformed values surface as `ShowHelpDueToError`,
//! which prints the help text and exits non-zero.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{AppConfig, DEFAULT_PIN_CONFIG_PATH, DEFAULT_SHOW_DURATION_SECS};
use crate::logger::Severity;

/// What the process should do, as determined from the command line.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon with these settings.
    Run { config: AppConfig },
    /// Display help information and exit.
    ShowHelp,
    /// Display version information and exit.
    ShowVersion,
    /// Show help due to bad arguments and exit non-zero.
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse from the process environment (skips argv[0]).
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args().skip(1))
    }

    /// Parse an argument list into a structured action.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = AppConfig::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "-t" | "--time" => config.show_time = true,
                "-T" | "--temperature" => config.show_temperature = true,
                "-H" | "--humidity" => config.show_humidity = true,
                "-d" | "--delay" => {
                    let Some(seconds) = args.next().and_then(|v| v.as_ref().parse::<u64>().ok())
                    else {
                        eprintln!("Error: --delay expects a number of seconds");
                        return ParsedArgs {
                            action: CliAction::ShowHelpDueToError,
                        };
                    };
                    config.show_duration = Duration::from_secs(seconds);
                }
                "-c" | "--pin-config" => {
                    let Some(path) = args.next() else {
                        eprintln!("Error: --pin-config expects a file path");
                        return ParsedArgs {
                            action: CliAction::ShowHelpDueToError,
                        };
                    };
                    config.pin_config_path = PathBuf::from(path.as_ref());
                }
                "-l" | "--loglevel" => {
                    let Some(severity) = args.next().and_then(|v| Severity::parse(v.as_ref()))
                    else {
                        eprintln!("Error: --loglevel expects error, warning, info or debug");
                        return ParsedArgs {
                            action: CliAction::ShowHelpDueToError,
                        };
                    };
                    config.min_severity = severity;
                }
                "-h" | "--help" => {
                    return ParsedArgs {
                        action: CliAction::ShowHelp,
                    };
                }
                "-V" | "--version" => {
                    return ParsedArgs {
                        action: CliAction::ShowVersion,
                    };
                }
                unknown => {
                    eprintln!("Error: unknown option: {unknown}");
                    return ParsedArgs {
                        action: CliAction::ShowHelpDueToError,
                    };
                }
            }
        }

        ParsedArgs {
            action: CliAction::Run { config },
        }
    }
}

/// Print the help text.
pub fn display_help() {
    println!(
        "Usage: temphum-clock [options]\n\
         \n\
         Options:\n\
         \x20 -t, --time               Enable the clock readout\n\
         \x20 -T, --temperature        Enable the temperature readout\n\
         \x20 -H, --humidity           Enable the humidity readout\n\
         \x20 -d, --delay <seconds>    Seconds each readout stays visible (default: {DEFAULT_SHOW_DURATION_SECS})\n\
         \x20 -c, --pin-config <path>  Pin assignment file (default: {DEFAULT_PIN_CONFIG_PATH})\n\
         \x20 -l, --loglevel <level>   Minimum log level: error, warning, info, debug (default: info)\n\
         \x20 -h, --help               Show this help message\n\
         \x20 -V, --version            Show version information"
    );
}

/// Print version information.
pub fn display_version_info() {
    println!("temphum-clock v{}", env!("CARGO_PKG_VERSION"));
}
