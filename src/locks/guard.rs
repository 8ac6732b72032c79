//! RAII lock guard implementation.

use super::manager::LockManager;
use crate::error::Result;
use std::sync::Arc;

/// RAII guard for a held lock.
///
/// When dropped, the lock is released through the manager that granted it.
/// If releasing fails, a warning is logged but no panic occurs.
pub struct LockGuard {
    manager: Arc<dyn LockManager>,

    /// Name of the held lock.
    name: String,

    /// Whether the lock has been released manually.
    released: bool,
}

impl LockGuard {
    /// Wrap a lock already acquired through `manager`.
    pub(super) fn new(manager: Arc<dyn LockManager>, name: impl Into<String>) -> Self {
        Self {
            manager,
            name: name.into(),
            released: false,
        }
    }

    /// The name of the held lock.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Manually release the lock.
    ///
    /// This is useful when you want to release the lock before the guard
    /// goes out of scope, and want to handle errors explicitly.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.manager.unlock(&self.name, false)
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("name", &self.name)
            .field("backend", &self.manager.backend_name())
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.manager.unlock(&self.name, false)
        {
            tracing::warn!(
                lock = %self.name,
                backend = self.manager.backend_name(),
                error = %e,
                "failed to release lock"
            );
        }
    }
}
