//! Picks the cache backend when one is usable, the in-process one otherwise.

use super::cache::LockCache;
use super::cached::{CacheLockManager, DEFAULT_LOCK_TTL};
use super::info::LockInfo;
use super::local::LocalLockManager;
use super::manager::LockManager;
use crate::error::Result;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const BACKEND: &str = "smart";

/// Which backend the dispatcher settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Cache,
    Local,
}

/// The cache wins only when it is configured and answered a ping.
pub fn select_backend(configured: bool, reachable: bool) -> BackendChoice {
    if configured && reachable {
        BackendChoice::Cache
    } else {
        BackendChoice::Local
    }
}

/// Dispatcher resolving its delegate on first use.
///
/// The choice is made once and kept for the life of the instance: a cache
/// that goes down later is not replaced by the local backend, and one that
/// comes up later is not picked up.
pub struct SmartLockManager {
    cache: Option<Arc<dyn LockCache>>,
    default_ttl: Duration,
    delegate: OnceLock<(BackendChoice, Box<dyn LockManager>)>,
}

impl SmartLockManager {
    pub fn new(cache: Option<Arc<dyn LockCache>>) -> Self {
        Self {
            cache,
            default_ttl: DEFAULT_LOCK_TTL,
            delegate: OnceLock::new(),
        }
    }

    /// TTL handed to the cache backend if it gets selected.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// The resolved choice, resolving now if needed.
    pub fn choice(&self) -> BackendChoice {
        self.resolved().0
    }

    fn resolved(&self) -> &(BackendChoice, Box<dyn LockManager>) {
        self.delegate.get_or_init(|| self.resolve())
    }

    fn delegate(&self) -> &dyn LockManager {
        self.resolved().1.as_ref()
    }

    fn resolve(&self) -> (BackendChoice, Box<dyn LockManager>) {
        let reachable = match &self.cache {
            Some(cache) => match cache.ping() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        cache = cache.cache_name(),
                        error = %e,
                        "lock cache unreachable, falling back to in-process locks"
                    );
                    false
                }
            },
            None => false,
        };

        match (select_backend(self.cache.is_some(), reachable), &self.cache) {
            (BackendChoice::Cache, Some(cache)) => {
                tracing::info!(cache = cache.cache_name(), "using cache lock backend");
                let manager: Box<dyn LockManager> = Box::new(
                    CacheLockManager::new(Arc::clone(cache)).with_default_ttl(self.default_ttl),
                );
                (BackendChoice::Cache, manager)
            }
            _ => {
                tracing::info!("using in-process lock backend");
                let manager: Box<dyn LockManager> = Box::new(LocalLockManager::new());
                (BackendChoice::Local, manager)
            }
        }
    }
}

impl LockManager for SmartLockManager {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn is_process_local(&self) -> bool {
        self.choice() == BackendChoice::Local
    }

    fn try_lock(&self, name: &str, acquire_timeout: Option<Duration>) -> bool {
        self.delegate().try_lock(name, acquire_timeout)
    }

    fn try_lock_with_ttl(
        &self,
        name: &str,
        acquire_timeout: Option<Duration>,
        lock_timeout: Duration,
    ) -> bool {
        self.delegate()
            .try_lock_with_ttl(name, acquire_timeout, lock_timeout)
    }

    fn is_locked(&self, name: &str) -> Result<bool> {
        self.delegate().is_locked(name)
    }

    fn unlock(&self, name: &str, force: bool) -> Result<()> {
        self.delegate().unlock(name, force)
    }

    fn get_locks(&self) -> Result<Vec<LockInfo>> {
        self.delegate().get_locks()
    }
}
