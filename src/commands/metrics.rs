//! `fleetlock metrics`: print the current lock counts.

use crate::cli::MetricsArgs;
use crate::error::{LockError, Result};
use crate::locks::Locks;
use crate::metrics::{MetricsReporter, MetricsSink, MetricsSnapshot};
use std::thread;
use std::time::Duration;

pub(super) fn cmd_metrics(locks: &Locks, args: MetricsArgs, interval: Duration) -> Result<()> {
    if args.watch {
        let sink = PrintSink { json: args.json };
        let _reporter = MetricsReporter::spawn(locks.clone(), interval, Box::new(sink))?;
        // Runs until the process is interrupted.
        loop {
            thread::park();
        }
    }

    println!("{}", format_snapshot(&locks.gather()?, args.json)?);
    Ok(())
}

/// Sink printing every snapshot to stdout.
struct PrintSink {
    json: bool,
}

impl MetricsSink for PrintSink {
    fn emit(&mut self, snapshot: &MetricsSnapshot) {
        match format_snapshot(snapshot, self.json) {
            Ok(text) => println!("{}", text),
            Err(e) => tracing::warn!(error = %e, "failed to print metrics"),
        }
    }
}

fn format_snapshot(snapshot: &MetricsSnapshot, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string(snapshot)
            .map_err(|e| LockError::UserError(format!("failed to serialize metrics: {}", e)));
    }
    Ok(format!(
        "Active locks:     {}\nLong-running:     {}",
        snapshot.held_count, snapshot.stale_count
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: MetricsSnapshot = MetricsSnapshot {
        held_count: 4,
        stale_count: 1,
    };

    #[test]
    fn format_plain() {
        assert_eq!(
            format_snapshot(&SNAPSHOT, false).unwrap(),
            "Active locks:     4\nLong-running:     1"
        );
    }

    #[test]
    fn format_json() {
        assert_eq!(
            format_snapshot(&SNAPSHOT, true).unwrap(),
            r#"{"held_count":4,"stale_count":1}"#
        );
    }
}
