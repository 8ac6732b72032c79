//! Fleetlock: administrative CLI for fleet-wide named locks.
//!
//! This is the main entry point for the `fleetlock` CLI. It parses arguments,
//! loads the configuration, dispatches to the appropriate command handler,
//! and handles errors with proper exit codes.

use fleetlock::cli::Cli;
use fleetlock::config::Config;
use fleetlock::error::Result;
use fleetlock::{commands, exit_codes, logging};
use std::process::ExitCode;

fn run(cli: Cli) -> Result<()> {
    logging::init_logging(cli.log_level.as_deref())?;
    let config = Config::resolve(cli.config.as_deref())?;
    commands::dispatch(cli.command, &config)
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(exit_codes::USER_ERROR as u8))
        }
    }
}
