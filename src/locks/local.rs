//! In-process lock backend.
//!
//! Locks live in a map owned by the manager instance and guarded by a single
//! mutex. Correct only within one address space: never select this backend
//! when several nodes must coordinate.

use super::backoff::{Acquire, Backoff, retry_acquire};
use super::info::{LOCAL_OWNER, LockInfo};
use super::manager::LockManager;
use crate::error::Result;
use crate::node::current_thread_name;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const BACKEND: &str = "local";

/// Map operations are O(1), so waits can be short.
pub const LOCAL_BACKOFF: Backoff = Backoff::from_millis(10, 10, 100);

/// Process-local lock manager.
///
/// `unlock` cannot tell which caller owns a lock, so it always removes it,
/// forced or not. Callers must only release locks they acquired.
#[derive(Debug, Default)]
pub struct LocalLockManager {
    locks: Mutex<HashMap<String, LockInfo>>,
    backoff: Option<Backoff>,
}

impl LocalLockManager {
    /// Create an empty in-process lock manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager polling with a custom backoff.
    pub fn with_backoff(backoff: Backoff) -> Self {
        Self {
            locks: Mutex::default(),
            backoff: Some(backoff),
        }
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<String, LockInfo>> {
        // A panic while holding the guard cannot leave the map half-updated.
        self.locks.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn acquire_once(&self, name: &str) -> Result<Acquire> {
        let mut locks = self.locks();
        if locks.contains_key(name) {
            return Ok(Acquire::AlreadyHeld);
        }
        locks.insert(
            name.to_string(),
            LockInfo::new(name, LOCAL_OWNER, current_thread_name()),
        );
        Ok(Acquire::Acquired)
    }
}

impl LockManager for LocalLockManager {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn is_process_local(&self) -> bool {
        true
    }

    fn try_lock(&self, name: &str, acquire_timeout: Option<Duration>) -> bool {
        retry_acquire(
            BACKEND,
            name,
            acquire_timeout,
            self.backoff.unwrap_or(LOCAL_BACKOFF),
            |name| self.acquire_once(name),
        )
    }

    fn is_locked(&self, name: &str) -> Result<bool> {
        Ok(self.locks().contains_key(name))
    }

    fn unlock(&self, name: &str, _force: bool) -> Result<()> {
        self.locks().remove(name);
        Ok(())
    }

    fn get_locks(&self) -> Result<Vec<LockInfo>> {
        Ok(self.locks().values().cloned().collect())
    }
}
