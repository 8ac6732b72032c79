//! Shared lock tables used by the storage-backed backend.
//!
//! A table stores one row per held lock, keyed uniquely by name. The
//! table's uniqueness constraint is the actual synchronization primitive:
//! of two concurrent inserts for the same name, exactly one succeeds.

mod file;
mod memory;

pub use file::FileLockTable;
pub use memory::MemoryLockTable;

use super::info::LockInfo;
use crate::error::Result;

/// Result of inserting a lock row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was created; the caller now holds the lock.
    Inserted,
    /// A row with the same name already exists.
    AlreadyExists,
}

/// Persistence seam for [`StorageLockManager`](super::StorageLockManager).
pub trait LockTable: Send + Sync {
    /// Short identity used in log records and errors.
    fn table_name(&self) -> &'static str;

    /// Insert `record`, reporting a uniqueness violation as
    /// [`InsertOutcome::AlreadyExists`] rather than as an error.
    fn insert(&self, record: &LockInfo) -> Result<InsertOutcome>;

    /// Delete the row named `name`, only if owned by `owner` when given.
    /// Returns the number of rows removed.
    fn delete(&self, name: &str, owner: Option<&str>) -> Result<usize>;

    /// Rows matching `name`, or every row when `name` is `None`.
    fn select(&self, name: Option<&str>) -> Result<Vec<LockInfo>>;
}
