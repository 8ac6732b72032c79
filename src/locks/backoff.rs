//! Polling acquisition for backends that can only "try once".
//!
//! A backend supplies an atomic, non-blocking attempt and a [`Backoff`]; the
//! loop here turns that into a bounded, blocking acquire. Waits grow linearly
//! and are capped, which keeps tail latency predictable without busy looping.

use crate::error::Result;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a single acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The lock is now held by the caller.
    Acquired,
    /// Somebody else holds the lock.
    AlreadyHeld,
}

/// Linear backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Wait after the first failed attempt.
    pub initial: Duration,
    /// Added to the wait after each failed attempt.
    pub increment: Duration,
    /// Upper bound for a single wait.
    pub max: Duration,
}

impl Backoff {
    pub const fn from_millis(initial: u64, increment: u64, max: u64) -> Self {
        Self {
            initial: Duration::from_millis(initial),
            increment: Duration::from_millis(increment),
            max: Duration::from_millis(max),
        }
    }

    /// The sequence of waits the retry loop would use, unbounded.
    pub fn intervals(self) -> impl Iterator<Item = Duration> {
        let Backoff {
            initial,
            increment,
            max,
        } = self;
        std::iter::successors(Some(initial.min(max)), move |wait| {
            Some((*wait + increment).min(max))
        })
    }
}

/// Run `attempt` until it acquires `name` or `acquire_timeout` elapses.
///
/// At least one attempt is always made. A `None` or zero timeout means a
/// single attempt without sleeping. Errors from `attempt` are logged with the
/// lock name and backend, and end the acquisition with `false`.
pub fn retry_acquire<F>(
    backend: &'static str,
    name: &str,
    acquire_timeout: Option<Duration>,
    backoff: Backoff,
    mut attempt: F,
) -> bool
where
    F: FnMut(&str) -> Result<Acquire>,
{
    let deadline = acquire_timeout
        .filter(|timeout| !timeout.is_zero())
        .map(|timeout| Instant::now() + timeout);
    let mut waits = backoff.intervals();

    loop {
        match attempt(name) {
            Ok(Acquire::Acquired) => {
                tracing::trace!(lock = name, backend, "lock acquired");
                return true;
            }
            Ok(Acquire::AlreadyHeld) => {}
            Err(e) => {
                tracing::error!(lock = name, backend, error = %e, "failed to acquire lock");
                return false;
            }
        }

        let Some(deadline) = deadline else {
            return false;
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let wait = waits.next().unwrap_or(backoff.max);
        thread::sleep(wait.min(remaining));

        if Instant::now() >= deadline {
            tracing::debug!(lock = name, backend, "gave up waiting for lock");
            return false;
        }
    }
}
