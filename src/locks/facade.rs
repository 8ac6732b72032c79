//! Entry point application code uses to take locks.

use super::guard::LockGuard;
use super::info::LockInfo;
use super::manager::LockManager;
use crate::error::Result;
use crate::metrics::MetricsSnapshot;
use std::sync::Arc;
use std::time::Duration;

/// Default age after which a held lock counts as stale.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(30 * 60);

/// Tunables of the [`Locks`] facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// Locks held longer than this are reported as stale.
    pub stale_threshold: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            stale_threshold: DEFAULT_STALE_THRESHOLD,
        }
    }
}

/// Named locks shared by every node running the same backend.
///
/// Cloning is cheap and clones share the backend.
#[derive(Clone)]
pub struct Locks {
    manager: Arc<dyn LockManager>,
    settings: LockSettings,
}

impl Locks {
    pub fn new(manager: Arc<dyn LockManager>) -> Self {
        Self::with_settings(manager, LockSettings::default())
    }

    pub fn with_settings(manager: Arc<dyn LockManager>, settings: LockSettings) -> Self {
        Self { manager, settings }
    }

    /// The backend behind this facade.
    pub fn manager(&self) -> &Arc<dyn LockManager> {
        &self.manager
    }

    pub fn settings(&self) -> LockSettings {
        self.settings
    }

    /// Whether the backend only excludes callers inside this process.
    pub fn is_process_local(&self) -> bool {
        self.manager.is_process_local()
    }

    /// Try to acquire `name`, retrying for up to `acquire_timeout`.
    ///
    /// Returns `false` when the lock is held elsewhere, when the backend
    /// failed, or when `name` is empty.
    pub fn try_lock(&self, name: &str, acquire_timeout: Option<Duration>) -> bool {
        if !Self::valid_name(name) {
            return false;
        }
        self.manager.try_lock(name, acquire_timeout)
    }

    /// Like [`try_lock`](Self::try_lock), asking the backend to expire the lock
    /// after `lock_timeout`. Only cache backends honour the expiry.
    pub fn try_lock_with_ttl(
        &self,
        name: &str,
        acquire_timeout: Option<Duration>,
        lock_timeout: Duration,
    ) -> bool {
        if !Self::valid_name(name) {
            return false;
        }
        self.manager
            .try_lock_with_ttl(name, acquire_timeout, lock_timeout)
    }

    /// Acquire `name` and hand back a guard releasing it on drop.
    pub fn lock_guard(&self, name: &str, acquire_timeout: Option<Duration>) -> Option<LockGuard> {
        self.try_lock(name, acquire_timeout)
            .then(|| LockGuard::new(Arc::clone(&self.manager), name))
    }

    /// Like [`lock_guard`](Self::lock_guard), asking the backend to expire the
    /// lock after `lock_timeout`.
    pub fn lock_guard_with_ttl(
        &self,
        name: &str,
        acquire_timeout: Option<Duration>,
        lock_timeout: Duration,
    ) -> Option<LockGuard> {
        self.try_lock_with_ttl(name, acquire_timeout, lock_timeout)
            .then(|| LockGuard::new(Arc::clone(&self.manager), name))
    }

    /// Run `task` while holding `name`.
    ///
    /// If the lock cannot be acquired the task is skipped and `None` is
    /// returned. The lock is released afterwards, also when `task` panics.
    pub fn try_locked<R>(
        &self,
        name: &str,
        acquire_timeout: Option<Duration>,
        task: impl FnOnce() -> R,
    ) -> Option<R> {
        let Some(_guard) = self.lock_guard(name, acquire_timeout) else {
            tracing::debug!(lock = name, "lock busy, skipping task");
            return None;
        };
        Some(task())
    }

    /// Whether `name` is held by this or any other node.
    ///
    /// Unlike acquisition, a backend failure is returned to the caller: an
    /// unknown answer must not read as "not locked".
    pub fn is_locked(&self, name: &str) -> Result<bool> {
        if name.is_empty() {
            return Ok(false);
        }
        self.manager.is_locked(name)
    }

    /// Release a lock held by this node.
    pub fn unlock(&self, name: &str) {
        self.unlock_with(name, false);
    }

    /// Release `name`; with `force` also when another node holds it.
    ///
    /// Forcing is meant for maintenance tools only. Failures are logged; use
    /// [`force_unlock`](Self::force_unlock) to see them.
    pub fn unlock_with(&self, name: &str, force: bool) {
        if name.is_empty() {
            return;
        }
        if let Err(e) = self.manager.unlock(name, force) {
            tracing::error!(
                lock = name,
                backend = self.manager.backend_name(),
                force,
                error = %e,
                "failed to release lock"
            );
        }
    }

    /// Release `name` whoever holds it, reporting backend failures.
    pub fn force_unlock(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Ok(());
        }
        self.manager.unlock(name, true)
    }

    /// Every held lock, sorted by name.
    ///
    /// Backend failures are returned rather than turned into an empty list.
    pub fn get_locks(&self) -> Result<Vec<LockInfo>> {
        let mut locks = self.manager.get_locks()?;
        locks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locks)
    }

    /// Count held and stale locks. Fails like [`get_locks`](Self::get_locks).
    pub fn gather(&self) -> Result<MetricsSnapshot> {
        let locks = self.manager.get_locks()?;
        let stale_count = locks
            .iter()
            .filter(|lock| lock.is_stale(self.settings.stale_threshold))
            .count();
        Ok(MetricsSnapshot {
            held_count: locks.len(),
            stale_count,
        })
    }

    fn valid_name(name: &str) -> bool {
        if name.is_empty() {
            tracing::warn!("refusing to acquire a lock with an empty name");
            return false;
        }
        true
    }
}

impl std::fmt::Debug for Locks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locks")
            .field("backend", &self.manager.backend_name())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::local::LocalLockManager;
    use crate::locks::storage::StorageLockManager;
    use crate::locks::table::{LockTable, MemoryLockTable};
    use chrono::Utc;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::thread;

    fn local_locks() -> Locks {
        Locks::new(Arc::new(LocalLockManager::new()))
    }

    #[test]
    fn try_locked_runs_task_and_releases() {
        let locks = local_locks();

        let result = locks.try_locked("job", None, || {
            assert!(locks.is_locked("job").unwrap());
            42
        });

        assert_eq!(result, Some(42));
        assert!(!locks.is_locked("job").unwrap());
    }

    #[test]
    fn try_locked_skips_task_when_held() {
        let locks = local_locks();
        assert!(locks.try_lock("job", None));

        let mut ran = false;
        let result = locks.try_locked("job", None, || ran = true);

        assert!(result.is_none());
        assert!(!ran);
        assert!(locks.is_locked("job").unwrap());
    }

    #[test]
    fn try_locked_releases_on_panic() {
        let locks = local_locks();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            locks.try_locked("job", None, || -> u32 { panic!("task failed") })
        }));

        assert!(outcome.is_err());
        assert!(!locks.is_locked("job").unwrap());
    }

    #[test]
    fn guard_releases_on_drop() {
        let locks = local_locks();
        {
            let guard = locks.lock_guard("job", None).unwrap();
            assert_eq!(guard.name(), "job");
            assert!(locks.lock_guard("job", None).is_none());
        }
        assert!(!locks.is_locked("job").unwrap());
    }

    #[test]
    fn guard_explicit_release() {
        let locks = local_locks();
        let guard = locks.lock_guard("job", None).unwrap();

        guard.release().unwrap();
        assert!(locks.try_lock("job", None));
    }

    #[test]
    fn empty_name_is_rejected() {
        let locks = local_locks();

        assert!(!locks.try_lock("", None));
        assert!(!locks.try_lock_with_ttl("", None, Duration::from_secs(1)));
        assert!(locks.try_locked("", None, || ()).is_none());
        assert!(!locks.is_locked("").unwrap());
        locks.unlock("");
        assert!(locks.get_locks().unwrap().is_empty());
    }

    #[test]
    fn get_locks_is_sorted() {
        let locks = local_locks();
        for name in ["zeta", "alpha", "mid"] {
            assert!(locks.try_lock(name, None));
        }

        let names: Vec<_> = locks
            .get_locks()
            .unwrap()
            .into_iter()
            .map(|lock| lock.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn gather_counts_stale_locks() {
        let table = Arc::new(MemoryLockTable::new());
        let mut old = LockInfo::new("old", "n1", "main");
        old.acquired_at = Utc::now() - chrono::Duration::minutes(45);
        table.insert(&old).unwrap();

        let locks = Locks::new(Arc::new(StorageLockManager::new(table, "n1")));
        assert!(locks.try_lock("fresh", None));

        let snapshot = locks.gather().unwrap();
        assert_eq!(snapshot.held_count, 2);
        assert_eq!(snapshot.stale_count, 1);
    }

    #[test]
    fn forced_unlock_frees_foreign_lock() {
        let table = Arc::new(MemoryLockTable::new());
        let n1 = Locks::new(Arc::new(StorageLockManager::new(Arc::clone(&table), "n1")));
        let admin = Locks::new(Arc::new(StorageLockManager::new(table, "admin")));
        assert!(n1.try_lock("R", None));

        admin.unlock("R");
        assert!(n1.is_locked("R").unwrap());

        admin.unlock_with("R", true);
        assert!(!n1.is_locked("R").unwrap());
        assert!(n1.try_lock("R", None));

        admin.force_unlock("R").unwrap();
        assert!(!n1.is_locked("R").unwrap());
    }

    #[test]
    fn process_local_backend_is_reported() {
        assert!(local_locks().is_process_local());

        let table = Arc::new(MemoryLockTable::new());
        let shared = Locks::new(Arc::new(StorageLockManager::new(table, "n1")));
        assert!(!shared.is_process_local());
    }

    #[test]
    fn two_threads_race_for_build_lock() {
        let locks = local_locks();
        let (first, second) = thread::scope(|s| {
            let a = s.spawn(|| {
                locks.try_locked("build-42", Some(Duration::from_secs(5)), || {
                    thread::sleep(Duration::from_millis(100));
                    Utc::now()
                })
            });
            let b = s.spawn(|| {
                locks.try_locked("build-42", Some(Duration::from_secs(5)), || {
                    thread::sleep(Duration::from_millis(100));
                    Utc::now()
                })
            });
            (a.join().unwrap(), b.join().unwrap())
        });

        // Both eventually run, one after the other.
        let (first, second) = (first.unwrap(), second.unwrap());
        let gap = (first - second).num_milliseconds().abs();
        assert!(gap >= 90, "tasks overlapped: {gap}ms apart");
        assert!(!locks.is_locked("build-42").unwrap());
    }
}
