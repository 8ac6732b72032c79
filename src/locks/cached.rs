//! Lock backend on top of an external TTL cache.

use super::cache::LockCache;
use super::info::{LockInfo, UNKNOWN_THREAD};
use super::manager::LockManager;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

const BACKEND: &str = "cache";

/// TTL applied when a caller does not ask for one.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30 * 60);

/// Lock manager delegating to a [`LockCache`].
///
/// This is the only backend whose locks expire by themselves.
pub struct CacheLockManager {
    cache: Arc<dyn LockCache>,
    default_ttl: Duration,
}

impl CacheLockManager {
    pub fn new(cache: Arc<dyn LockCache>) -> Self {
        Self {
            cache,
            default_ttl: DEFAULT_LOCK_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn cache(&self) -> &Arc<dyn LockCache> {
        &self.cache
    }
}

impl LockManager for CacheLockManager {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn try_lock(&self, name: &str, acquire_timeout: Option<Duration>) -> bool {
        self.try_lock_with_ttl(name, acquire_timeout, self.default_ttl)
    }

    fn try_lock_with_ttl(
        &self,
        name: &str,
        acquire_timeout: Option<Duration>,
        lock_timeout: Duration,
    ) -> bool {
        match self.cache.try_acquire(name, acquire_timeout, lock_timeout) {
            Ok(acquired) => acquired,
            Err(e) => {
                tracing::error!(
                    lock = name,
                    backend = BACKEND,
                    cache = self.cache.cache_name(),
                    error = %e,
                    "failed to acquire lock"
                );
                false
            }
        }
    }

    fn is_locked(&self, name: &str) -> Result<bool> {
        self.cache.is_held(name)
    }

    fn unlock(&self, name: &str, force: bool) -> Result<()> {
        self.cache.release(name, force)
    }

    fn get_locks(&self) -> Result<Vec<LockInfo>> {
        Ok(self
            .cache
            .list()?
            .into_iter()
            .map(|lock| LockInfo {
                name: lock.name,
                owner: lock.owner,
                thread: UNKNOWN_THREAD.to_string(),
                acquired_at: lock.since,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LockError;
    use crate::locks::cache::{CacheLock, MemoryLockCache};
    use std::thread;

    struct DownCache;

    impl LockCache for DownCache {
        fn cache_name(&self) -> &'static str {
            "down"
        }

        fn try_acquire(&self, _: &str, _: Option<Duration>, _: Duration) -> Result<bool> {
            Err(LockError::backend("down", "connection reset"))
        }

        fn release(&self, _: &str, _: bool) -> Result<()> {
            Err(LockError::backend("down", "connection reset"))
        }

        fn is_held(&self, _: &str) -> Result<bool> {
            Err(LockError::backend("down", "connection reset"))
        }

        fn list(&self) -> Result<Vec<CacheLock>> {
            Err(LockError::backend("down", "connection reset"))
        }

        fn ping(&self) -> Result<()> {
            Err(LockError::backend("down", "connection reset"))
        }
    }

    #[test]
    fn locks_are_reported_without_thread() {
        let manager = CacheLockManager::new(Arc::new(MemoryLockCache::new("n1")));
        assert!(manager.try_lock("R", None));

        let locks = manager.get_locks().unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].name, "R");
        assert_eq!(locks[0].owner, "n1");
        assert_eq!(locks[0].thread, UNKNOWN_THREAD);
    }

    #[test]
    fn default_ttl_applies_without_lock_timeout() {
        let manager = CacheLockManager::new(Arc::new(MemoryLockCache::new("n1")))
            .with_default_ttl(Duration::from_millis(20));
        assert!(manager.try_lock("R", None));

        thread::sleep(Duration::from_millis(40));
        assert!(!manager.is_locked("R").unwrap());
    }

    #[test]
    fn explicit_ttl_expires_lock() {
        let manager = CacheLockManager::new(Arc::new(MemoryLockCache::new("n1")));
        assert!(manager.try_lock_with_ttl("R", None, Duration::from_millis(20)));
        assert!(manager.is_locked("R").unwrap());

        thread::sleep(Duration::from_millis(40));
        assert!(manager.try_lock("R", None));
    }

    #[test]
    fn huge_lock_timeout_holds_until_released() {
        let manager = CacheLockManager::new(Arc::new(MemoryLockCache::new("n1")));

        assert!(manager.try_lock_with_ttl("R", None, Duration::MAX));
        assert!(manager.is_locked("R").unwrap());
        assert!(!manager.try_lock("R", None));

        manager.unlock("R", false).unwrap();
        assert!(!manager.is_locked("R").unwrap());
    }

    #[test]
    fn non_owner_unlock_is_noop() {
        let cache = MemoryLockCache::new("n1");
        let n1 = CacheLockManager::new(Arc::new(cache.clone()));
        let n2 = CacheLockManager::new(Arc::new(cache.for_node("n2")));
        assert!(n1.try_lock("R", None));

        n2.unlock("R", false).unwrap();
        assert!(n1.is_locked("R").unwrap());

        n2.unlock("R", true).unwrap();
        assert!(!n1.is_locked("R").unwrap());
    }

    #[test]
    fn cache_failure_is_not_acquired() {
        let manager = CacheLockManager::new(Arc::new(DownCache));

        assert!(!manager.try_lock("R", Some(Duration::from_secs(1))));
        assert!(manager.is_locked("R").is_err());
        assert!(manager.get_locks().is_err());
    }
}
