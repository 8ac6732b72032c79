//! External TTL caches able to hold locks.
//!
//! A cache lock is a key set only if absent, with an expiry. Entries vanish on
//! their own when the TTL runs out, which is what lets a crashed holder's lock
//! free itself.

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::{CACHE_BACKOFF, MemoryLockCache};
#[cfg(feature = "redis")]
pub use self::redis::RedisLockCache;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A lock entry as the cache stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLock {
    pub name: String,
    pub owner: String,
    pub since: DateTime<Utc>,
}

/// Lock operations offered by an external cache.
pub trait LockCache: Send + Sync {
    /// Short identity used in log records and errors.
    fn cache_name(&self) -> &'static str;

    /// Acquire `name` for `ttl`, waiting up to `acquire_timeout`.
    ///
    /// Contention yields `Ok(false)`; only infrastructure failures are errors.
    fn try_acquire(&self, name: &str, acquire_timeout: Option<Duration>, ttl: Duration)
    -> Result<bool>;

    /// Drop `name` if this node owns it, or unconditionally with `force`.
    fn release(&self, name: &str, force: bool) -> Result<()>;

    /// Whether a live entry exists for `name`.
    fn is_held(&self, name: &str) -> Result<bool>;

    /// Every live entry.
    fn list(&self) -> Result<Vec<CacheLock>>;

    /// Check the cache can be reached.
    fn ping(&self) -> Result<()>;
}
