//! Process-local cache with lazy expiry.

use super::{CacheLock, LockCache};
use crate::error::Result;
use crate::locks::backoff::{Acquire, Backoff, retry_acquire};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

const CACHE: &str = "memory-cache";

/// Polling used while waiting for a held entry.
pub const CACHE_BACKOFF: Backoff = Backoff::from_millis(100, 100, 1000);

#[derive(Debug, Clone)]
struct Entry {
    lock: CacheLock,
    /// `None` when the TTL is too long to represent: the entry never expires.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

type Entries = Arc<Mutex<HashMap<String, Entry>>>;

/// In-memory TTL cache.
///
/// Clones share the same entries, so several handles with different node
/// names behave like several nodes talking to one cache server.
#[derive(Debug, Clone)]
pub struct MemoryLockCache {
    entries: Entries,
    node: String,
    backoff: Backoff,
}

impl MemoryLockCache {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            entries: Arc::default(),
            node: node.into(),
            backoff: CACHE_BACKOFF,
        }
    }

    /// Another handle on the same entries acting as `node`.
    pub fn for_node(&self, node: impl Into<String>) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            node: node.into(),
            backoff: self.backoff,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Lock the entry map with expired entries already dropped.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        let mut entries = self.entries.lock().unwrap_or_else(|poison| poison.into_inner());
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        entries
    }

    fn acquire_once(&self, name: &str, ttl: Duration) -> Result<Acquire> {
        let mut entries = self.entries();
        if entries.contains_key(name) {
            return Ok(Acquire::AlreadyHeld);
        }
        entries.insert(
            name.to_string(),
            Entry {
                lock: CacheLock {
                    name: name.to_string(),
                    owner: self.node.clone(),
                    since: Utc::now(),
                },
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(Acquire::Acquired)
    }
}

impl LockCache for MemoryLockCache {
    fn cache_name(&self) -> &'static str {
        CACHE
    }

    fn try_acquire(
        &self,
        name: &str,
        acquire_timeout: Option<Duration>,
        ttl: Duration,
    ) -> Result<bool> {
        Ok(retry_acquire(CACHE, name, acquire_timeout, self.backoff, |name| {
            self.acquire_once(name, ttl)
        }))
    }

    fn release(&self, name: &str, force: bool) -> Result<()> {
        let mut entries = self.entries();
        if entries
            .get(name)
            .is_some_and(|entry| force || entry.lock.owner == self.node)
        {
            entries.remove(name);
        }
        Ok(())
    }

    fn is_held(&self, name: &str) -> Result<bool> {
        Ok(self.entries().contains_key(name))
    }

    fn list(&self) -> Result<Vec<CacheLock>> {
        Ok(self.entries().values().map(|entry| entry.lock.clone()).collect())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
