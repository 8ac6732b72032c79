//! Lock health metrics.
//!
//! The facade can count held and stale locks; a [`MetricsReporter`] samples
//! those counts periodically and hands them to a [`MetricsSink`].

use crate::error::{LockError, Result};
use crate::locks::Locks;
use serde::Serialize;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Counts gathered from a lock backend at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Active locks.
    pub held_count: usize,
    /// Locks held longer than the stale threshold.
    pub stale_count: usize,
}

/// Destination for metric snapshots.
pub trait MetricsSink: Send {
    fn emit(&mut self, snapshot: &MetricsSnapshot);
}

/// Sink writing snapshots as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn emit(&mut self, snapshot: &MetricsSnapshot) {
        tracing::info!(
            target: "fleetlock::metrics",
            locks_count = snapshot.held_count,
            locks_long_running = snapshot.stale_count,
            "lock metrics"
        );
        if snapshot.stale_count > 0 {
            tracing::warn!(
                target: "fleetlock::metrics",
                stale = snapshot.stale_count,
                "locks held longer than the stale threshold"
            );
        }
    }
}

/// Background thread gathering metrics every interval.
///
/// Stops on [`stop`](Self::stop) or when dropped.
pub struct MetricsReporter {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MetricsReporter {
    /// Start reporting. The first snapshot is taken right away.
    pub fn spawn(
        locks: Locks,
        interval: Duration,
        mut sink: Box<dyn MetricsSink>,
    ) -> Result<Self> {
        let (shutdown, stop_signal) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("fleetlock-metrics".to_string())
            .spawn(move || {
                loop {
                    match locks.gather() {
                        Ok(snapshot) => sink.emit(&snapshot),
                        Err(e) => tracing::warn!(error = %e, "failed to gather lock metrics"),
                    }
                    match stop_signal.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("metrics reporter stopped");
            })
            .map_err(|e| {
                LockError::backend("metrics", format!("failed to start reporter thread: {}", e))
            })?;

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("metrics reporter thread panicked");
        }
    }
}

impl Drop for MetricsReporter {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
