//! Command-line argument parsing.
//!
//! This module handles parsing command-line arguments and determining
//! which command to execute.

use std::path::PathBuf;

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Validate the configuration and exit
    Check { config: Option<PathBuf> },
    /// Initial load plus one detection cycle, print properties, exit
    Once { config: Option<PathBuf> },
    /// Load, then keep watching until Ctrl-C (default)
    Run { config: Option<PathBuf> },
}

/// Parse command-line arguments and return the appropriate command.
///
/// # Arguments
///
/// * `args` - Iterator of command-line arguments (typically `std::env::args()`)
///
/// # Examples
///
/// ```
/// use appconfig_sync::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["appconfig-sync".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let mut config = None;
    let mut check = false;
    let mut once = false;

    // Skip the program name
    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--check" => check = true,
            "--once" => once = true,
            "--config" | "-c" => config = args.next().map(PathBuf::from),
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    config = Some(PathBuf::from(path));
                }
            }
        }
    }

    if check {
        CliCommand::Check { config }
    } else if once {
        CliCommand::Once { config }
    } else {
        CliCommand::Run { config }
    }
}
