//! `fleetlock exec`: run a command while holding a lock.

use crate::cli::ExecArgs;
use crate::error::{LockError, Result};
use crate::locks::Locks;
use std::process::Command;
use std::time::Duration;

pub(super) fn cmd_exec(locks: &Locks, args: ExecArgs) -> Result<()> {
    // Each fleetlock process would get its own private lock.
    if locks.is_process_local() {
        return Err(LockError::ConfigError(format!(
            "backend '{}' resolved to in-process locks, which cannot exclude other fleetlock processes\n\
             Fix: set `backend: file` with a shared `file_store.dir`, or configure `redis.url`.",
            locks.manager().backend_name()
        )));
    }

    let argv = parse_command(&args.command)?;
    let acquire_timeout = (args.timeout_ms > 0).then(|| Duration::from_millis(args.timeout_ms));

    let guard = match args.ttl_secs {
        Some(ttl) => locks.lock_guard_with_ttl(&args.name, acquire_timeout, Duration::from_secs(ttl)),
        None => locks.lock_guard(&args.name, acquire_timeout),
    }
    .ok_or_else(|| LockError::NotAcquired(args.name.clone()))?;

    tracing::info!(lock = guard.name(), command = %args.command, "running command under lock");
    let status = run(&argv);
    guard.release()?;
    let status = status?;

    if status.success() {
        Ok(())
    } else {
        // Killed by a signal: no exit code to pass on.
        Err(LockError::CommandFailed(status.code().unwrap_or(1)))
    }
}

/// Split a command line into program and arguments.
fn parse_command(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command.trim()).map_err(|e| {
        LockError::UserError(format!(
            "failed to parse command '{}': {}\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            command, e
        ))
    })?;

    if argv.is_empty() {
        return Err(LockError::UserError("command is empty".to_string()));
    }
    Ok(argv)
}

fn run(argv: &[String]) -> Result<std::process::ExitStatus> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| LockError::UserError("command is empty".to_string()))?;

    Command::new(program).args(args).status().map_err(|e| {
        LockError::UserError(format!(
            "failed to execute '{}': {}\nFix: ensure the command is installed and in PATH.",
            program, e
        ))
    })
}
