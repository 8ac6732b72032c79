//! `fleetlock locks`: list active locks and force-release one.

use crate::cli::LocksArgs;
use crate::error::{LockError, Result};
use crate::locks::{LockInfo, Locks};
use globset::{Glob, GlobMatcher};
use std::time::Duration;

const HEADERS: [&str; 5] = ["NAME", "OWNER", "THREAD", "ACQUIRED", "AGE"];

pub(super) fn cmd_locks(locks: &Locks, args: LocksArgs) -> Result<()> {
    let filter = args.filter.as_deref().map(build_filter).transpose()?;

    if locks.is_process_local() {
        tracing::warn!(
            backend = locks.manager().backend_name(),
            "backend only sees locks of this process; configure backend 'file' or redis.url to inspect the fleet"
        );
    }

    if let Some(name) = args.name.as_deref() {
        if name.is_empty() {
            return Err(LockError::UserError("lock name must not be empty".to_string()));
        }
        tracing::info!(lock = name, "force-releasing lock");
        locks.force_unlock(name)?;
        println!("Released lock '{}'.", name);
        println!();
    }

    let mut active = locks.get_locks()?;
    if let Some(filter) = &filter {
        active.retain(|lock| filter.is_match(&lock.name));
    }

    print!("{}", render_table(&active, locks.settings().stale_threshold));

    let stale_count = active
        .iter()
        .filter(|lock| lock.is_stale(locks.settings().stale_threshold))
        .count();
    if stale_count > 0 {
        println!();
        println!(
            "Note: {} lock(s) are stale. Use `fleetlock locks <name>` to release one whose holder has crashed.",
            stale_count
        );
    }

    Ok(())
}

fn build_filter(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| LockError::UserError(format!("invalid --filter '{}': {}", pattern, e)))
}

/// Render `locks` as fixed-width columns, marking stale ones.
fn render_table(locks: &[LockInfo], stale_threshold: Duration) -> String {
    if locks.is_empty() {
        return "No active locks.\n".to_string();
    }

    let rows: Vec<[String; 5]> = locks
        .iter()
        .map(|lock| {
            [
                lock.name.clone(),
                lock.owner.clone(),
                lock.thread.clone(),
                lock.acquired_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                lock.age_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(String::from), &widths, "");
    for (row, lock) in rows.iter().zip(locks) {
        let marker = if lock.is_stale(stale_threshold) {
            "STALE"
        } else {
            ""
        };
        push_row(&mut out, row, &widths, marker);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5], marker: &str) {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str(&format!("{:<width$}  ", cell, width = width));
    }
    line.push_str(marker);
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use crate::locks::StorageLockManager;
    use crate::locks::LockManager;
    use crate::locks::table::{InsertOutcome, LockTable, MemoryLockTable};
    use chrono::Utc;
    use std::sync::Arc;

    const THRESHOLD: Duration = Duration::from_secs(30 * 60);

    fn lock(name: &str, owner: &str, minutes_ago: i64) -> LockInfo {
        let mut lock = LockInfo::new(name, owner, "main");
        lock.acquired_at = Utc::now() - chrono::Duration::minutes(minutes_ago);
        lock
    }

    #[test]
    fn empty_list_message() {
        assert_eq!(render_table(&[], THRESHOLD), "No active locks.\n");
    }

    #[test]
    fn columns_are_aligned() {
        let locks = vec![
            lock("a", "node-with-long-name", 1),
            lock("nightly-import", "n2", 2),
        ];
        let table = render_table(&locks, THRESHOLD);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME            OWNER"));
        let owner_col = lines[0].find("OWNER").unwrap();
        assert_eq!(&lines[1][owner_col..owner_col + 19], "node-with-long-name");
        assert_eq!(&lines[2][owner_col..owner_col + 2], "n2");

        let thread_col = lines[0].find("THREAD").unwrap();
        assert_eq!(&lines[2][thread_col..thread_col + 4], "main");
    }

    #[test]
    fn stale_locks_are_marked() {
        let locks = vec![lock("fresh", "n1", 1), lock("stuck", "n1", 90)];
        let table = render_table(&locks, THRESHOLD);
        let lines: Vec<&str> = table.lines().collect();

        assert!(!lines[1].ends_with("STALE"));
        assert!(lines[2].ends_with("STALE"));
        assert!(lines[2].contains("1h 30m"));
    }

    #[test]
    fn filter_matches_glob() {
        let filter = build_filter("import-*").unwrap();
        assert!(filter.is_match("import-42"));
        assert!(!filter.is_match("export-42"));
    }

    /// Table that keeps every row: deletes fail like a lost connection.
    struct UndeletableTable(MemoryLockTable);

    impl LockTable for UndeletableTable {
        fn table_name(&self) -> &'static str {
            "undeletable"
        }

        fn insert(&self, record: &LockInfo) -> Result<InsertOutcome> {
            self.0.insert(record)
        }

        fn delete(&self, _name: &str, _owner: Option<&str>) -> Result<usize> {
            Err(LockError::backend("undeletable", "connection lost"))
        }

        fn select(&self, name: Option<&str>) -> Result<Vec<LockInfo>> {
            self.0.select(name)
        }
    }

    fn locks_args(name: Option<&str>) -> LocksArgs {
        LocksArgs {
            name: name.map(str::to_string),
            filter: None,
        }
    }

    #[test]
    fn force_release_removes_lock() {
        let table = Arc::new(MemoryLockTable::new());
        let holder = StorageLockManager::new(Arc::clone(&table), "n1");
        assert!(holder.try_lock("R", None));
        let admin = Locks::new(Arc::new(StorageLockManager::new(table, "admin")));

        cmd_locks(&admin, locks_args(Some("R"))).unwrap();
        assert!(!admin.is_locked("R").unwrap());
    }

    #[test]
    fn failed_force_release_is_backend_failure() {
        let table = UndeletableTable(MemoryLockTable::new());
        table.insert(&LockInfo::new("R", "n1", "main")).unwrap();
        let admin = Locks::new(Arc::new(StorageLockManager::new(Arc::new(table), "admin")));

        let err = cmd_locks(&admin, locks_args(Some("R"))).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::BACKEND_FAILURE);
        assert!(admin.is_locked("R").unwrap());
    }

    #[test]
    fn empty_name_is_user_error() {
        let table = Arc::new(MemoryLockTable::new());
        let admin = Locks::new(Arc::new(StorageLockManager::new(table, "admin")));

        let err = cmd_locks(&admin, locks_args(Some(""))).unwrap_err();
        assert!(matches!(err, LockError::UserError(_)));
    }

    #[test]
    fn invalid_filter_is_user_error() {
        let err = build_filter("import-[").unwrap_err();
        assert!(matches!(err, LockError::UserError(_)));
    }
}
