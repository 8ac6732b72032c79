//! Command implementations for fleetlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every command works on the [`Locks`] facade built from
//! the resolved configuration.

mod exec;
mod locks;
mod metrics;

use crate::backend::build_locks;
use crate::cli::Command;
use crate::config::Config;
use crate::error::Result;
use crate::locks::Locks;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. The backend is
/// built once here and handed to the handler.
pub fn dispatch(command: Command, config: &Config) -> Result<()> {
    let locks = build_locks(config)?;
    run(command, &locks, config)
}

fn run(command: Command, locks: &Locks, config: &Config) -> Result<()> {
    match command {
        Command::Locks(args) => locks::cmd_locks(locks, args),
        Command::Metrics(args) => metrics::cmd_metrics(locks, args, config.metrics_interval()),
        Command::Exec(args) => exec::cmd_exec(locks, args),
    }
}
