//! Lock backend backed by a shared lock table.
//!
//! Every node writes into the same table. Inserting a row is the atomic
//! acquire primitive: the table's uniqueness constraint on the lock name lets
//! exactly one of several concurrent inserts win.

use super::backoff::{Acquire, Backoff, retry_acquire};
use super::info::LockInfo;
use super::manager::LockManager;
use super::table::{InsertOutcome, LockTable};
use crate::error::Result;
use crate::node::current_thread_name;
use std::sync::Arc;
use std::time::Duration;

const BACKEND: &str = "storage";

/// Every attempt is a round trip to the store, so waits start long.
pub const STORAGE_BACKOFF: Backoff = Backoff::from_millis(500, 500, 1500);

/// Cluster-wide lock manager on top of a [`LockTable`].
///
/// Locks have no expiry: a crashed holder keeps its row until someone
/// force-unlocks it.
pub struct StorageLockManager<T: LockTable> {
    table: Arc<T>,
    node: String,
    backoff: Backoff,
}

impl<T: LockTable> StorageLockManager<T> {
    /// Create a manager writing rows owned by `node` into `table`.
    pub fn new(table: Arc<T>, node: impl Into<String>) -> Self {
        Self {
            table,
            node: node.into(),
            backoff: STORAGE_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// The owner id this manager records.
    pub fn node(&self) -> &str {
        &self.node
    }

    fn acquire_once(&self, name: &str) -> Result<Acquire> {
        let record = LockInfo::new(name, self.node.as_str(), current_thread_name());
        Ok(match self.table.insert(&record)? {
            InsertOutcome::Inserted => Acquire::Acquired,
            InsertOutcome::AlreadyExists => Acquire::AlreadyHeld,
        })
    }
}

impl<T: LockTable> LockManager for StorageLockManager<T> {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn try_lock(&self, name: &str, acquire_timeout: Option<Duration>) -> bool {
        retry_acquire(BACKEND, name, acquire_timeout, self.backoff, |name| {
            self.acquire_once(name)
        })
    }

    fn is_locked(&self, name: &str) -> Result<bool> {
        Ok(!self.table.select(Some(name))?.is_empty())
    }

    /// A non-forced unlock deletes the row only if this node owns it. Tables
    /// may check the owner and delete in two steps: after an admin forced the
    /// lock away and another node re-acquired it, a late unlock from the old
    /// owner can still remove the new holder's row.
    fn unlock(&self, name: &str, force: bool) -> Result<()> {
        let owner = (!force).then_some(self.node.as_str());
        let removed = self.table.delete(name, owner)?;
        tracing::debug!(
            lock = name,
            backend = BACKEND,
            table = self.table.table_name(),
            force,
            removed,
            "unlock"
        );
        Ok(())
    }

    fn get_locks(&self) -> Result<Vec<LockInfo>> {
        self.table.select(None)
    }
}
