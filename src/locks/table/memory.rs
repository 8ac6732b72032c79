//! Process-local lock table.

use super::{InsertOutcome, LockTable};
use crate::error::Result;
use crate::locks::info::LockInfo;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Lock table kept in memory, shareable between managers in one process.
///
/// Useful for tests and for embedding several simulated nodes in one binary.
#[derive(Debug, Default)]
pub struct MemoryLockTable {
    rows: Mutex<HashMap<String, LockInfo>>,
}

impl MemoryLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<String, LockInfo>> {
        self.rows.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl LockTable for MemoryLockTable {
    fn table_name(&self) -> &'static str {
        "memory"
    }

    fn insert(&self, record: &LockInfo) -> Result<InsertOutcome> {
        let mut rows = self.rows();
        if rows.contains_key(&record.name) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        rows.insert(record.name.clone(), record.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn delete(&self, name: &str, owner: Option<&str>) -> Result<usize> {
        let mut rows = self.rows();
        let matches = rows
            .get(name)
            .is_some_and(|row| owner.is_none_or(|owner| row.owner == owner));
        if matches {
            rows.remove(name);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn select(&self, name: Option<&str>) -> Result<Vec<LockInfo>> {
        let rows = self.rows();
        Ok(match name {
            Some(name) => rows.get(name).cloned().into_iter().collect(),
            None => rows.values().cloned().collect(),
        })
    }
}
