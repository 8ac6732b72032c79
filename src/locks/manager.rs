//! The contract every lock backend implements.

use super::info::LockInfo;
use crate::error::Result;
use std::time::Duration;

/// A backend able to hand out named, mutually exclusive locks.
///
/// Mutual exclusion is only guaranteed among callers that share one backend
/// type: a fleet must run exactly one kind of backend cluster-wide.
///
/// # Contention versus failure
///
/// `try_lock` never reports contention as an error, it returns `false`.
/// Infrastructure failures during acquisition are logged by the backend and
/// also surface as `false`, so the return value alone cannot tell an outage
/// from a busy lock.
pub trait LockManager: Send + Sync {
    /// Short backend identity used in log records, e.g. `"local"`.
    fn backend_name(&self) -> &'static str;

    /// Whether locks are only visible inside this process.
    ///
    /// Such a backend excludes nothing between separate processes or nodes.
    fn is_process_local(&self) -> bool {
        false
    }

    /// Try to acquire `name`, retrying until `acquire_timeout` elapses.
    ///
    /// `None` or a zero timeout means exactly one attempt with no sleeping.
    /// Blocks the calling thread between attempts.
    fn try_lock(&self, name: &str, acquire_timeout: Option<Duration>) -> bool;

    /// Like [`try_lock`](Self::try_lock), additionally asking the backend to
    /// expire the lock after `lock_timeout`.
    ///
    /// Expiry is best effort: backends without native expiry ignore
    /// `lock_timeout` and behave exactly like `try_lock`. Callers must not
    /// rely on auto-expiry unless they know the backend honours it.
    fn try_lock_with_ttl(
        &self,
        name: &str,
        acquire_timeout: Option<Duration>,
        lock_timeout: Duration,
    ) -> bool {
        tracing::debug!(
            lock = name,
            backend = self.backend_name(),
            ttl_secs = lock_timeout.as_secs(),
            "backend has no native expiry, ignoring lock timeout"
        );
        self.try_lock(name, acquire_timeout)
    }

    /// Whether any owner currently holds `name`.
    fn is_locked(&self, name: &str) -> Result<bool>;

    /// Release `name`.
    ///
    /// With `force == false` only the caller's own lock is removed where the
    /// backend can verify ownership. With `force == true` the lock is removed
    /// whoever holds it. Releasing a lock nobody holds is a no-op.
    fn unlock(&self, name: &str, force: bool) -> Result<()>;

    /// Snapshot of every lock this backend knows about, in no particular order.
    fn get_locks(&self) -> Result<Vec<LockInfo>>;
}
