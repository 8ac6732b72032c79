//! CLI argument parsing for fleetlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fleetlock: named locks shared by a fleet of cooperating nodes.
///
/// Inspect and release locks held in the configured backend, or run a
/// command while holding one.
#[derive(Parser, Debug)]
#[command(name = "fleetlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (defaults to $FLEETLOCK_CONFIG, then ./fleetlock.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error (overrides $FLEETLOCK_LOG).
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for fleetlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List active locks, or force-release one.
    ///
    /// With a NAME the lock is released whoever holds it, then the
    /// remaining locks are listed. Only use this on locks whose holder has
    /// crashed.
    Locks(LocksArgs),

    /// Print the number of held and stale locks.
    Metrics(MetricsArgs),

    /// Run a command while holding a lock.
    ///
    /// Exits with code 3 without running anything if the lock cannot be
    /// acquired in time.
    Exec(ExecArgs),
}

/// Arguments for the `locks` command.
#[derive(Parser, Debug)]
pub struct LocksArgs {
    /// Lock to force-release before listing.
    pub name: Option<String>,

    /// Only list locks whose name matches this glob, e.g. `import-*`.
    #[arg(long, value_name = "GLOB")]
    pub filter: Option<String>,
}

/// Arguments for the `metrics` command.
#[derive(Parser, Debug)]
pub struct MetricsArgs {
    /// Print the snapshot as JSON.
    #[arg(long)]
    pub json: bool,

    /// Keep printing a snapshot every `metrics.interval_secs` until interrupted.
    #[arg(long)]
    pub watch: bool,
}

/// Arguments for the `exec` command.
#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Name of the lock to hold.
    pub name: String,

    /// Command line to run, split like a POSIX shell would.
    pub command: String,

    /// How long to wait for the lock, in milliseconds (0 = a single attempt).
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub timeout_ms: u64,

    /// Let expiring backends drop the lock after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub ttl_secs: Option<u64>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_locks_list() {
        let cli = Cli::try_parse_from(["fleetlock", "locks"]).unwrap();
        if let Command::Locks(args) = cli.command {
            assert!(args.name.is_none());
            assert!(args.filter.is_none());
        } else {
            panic!("Expected Locks command");
        }
    }

    #[test]
    fn parse_locks_force_release_with_filter() {
        let cli =
            Cli::try_parse_from(["fleetlock", "locks", "import-42", "--filter", "import-*"])
                .unwrap();
        if let Command::Locks(args) = cli.command {
            assert_eq!(args.name.as_deref(), Some("import-42"));
            assert_eq!(args.filter.as_deref(), Some("import-*"));
        } else {
            panic!("Expected Locks command");
        }
    }

    #[test]
    fn parse_metrics() {
        let cli = Cli::try_parse_from(["fleetlock", "metrics", "--json"]).unwrap();
        if let Command::Metrics(args) = cli.command {
            assert!(args.json);
            assert!(!args.watch);
        } else {
            panic!("Expected Metrics command");
        }
    }

    #[test]
    fn parse_exec() {
        let cli = Cli::try_parse_from([
            "fleetlock",
            "exec",
            "nightly-import",
            "./import.sh --full",
            "--timeout-ms",
            "5000",
            "--ttl-secs",
            "600",
        ])
        .unwrap();
        if let Command::Exec(args) = cli.command {
            assert_eq!(args.name, "nightly-import");
            assert_eq!(args.command, "./import.sh --full");
            assert_eq!(args.timeout_ms, 5000);
            assert_eq!(args.ttl_secs, Some(600));
        } else {
            panic!("Expected Exec command");
        }
    }

    #[test]
    fn parse_exec_defaults() {
        let cli = Cli::try_parse_from(["fleetlock", "exec", "job", "true"]).unwrap();
        if let Command::Exec(args) = cli.command {
            assert_eq!(args.timeout_ms, 0);
            assert!(args.ttl_secs.is_none());
        } else {
            panic!("Expected Exec command");
        }
    }

    #[test]
    fn parse_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fleetlock",
            "locks",
            "--config",
            "/etc/fleetlock.yaml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/fleetlock.yaml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn exec_requires_command() {
        assert!(Cli::try_parse_from(["fleetlock", "exec", "job"]).is_err());
    }

    #[test]
    fn unknown_command_fails() {
        assert!(Cli::try_parse_from(["fleetlock", "unknown"]).is_err());
    }
}
