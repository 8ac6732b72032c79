//! Lock table made of one file per lock.
//!
//! Lock files are created with **create_new** semantics (exclusive create),
//! so only one process can create a given file. Any number of nodes can
//! coordinate through a directory they all mount.
//!
//! Each lock file contains the JSON-encoded [`LockInfo`] row. File names are
//! derived from the lock name with every byte outside `[A-Za-z0-9._-]`
//! written as `%XX`, so arbitrary names map to safe, distinct file names.
//!
//! A lock file that exists but cannot be read or parsed still blocks
//! acquisition, so it is reported as held by an unknown owner. That covers a
//! holder that crashed between creating the file and writing its row.

use super::{InsertOutcome, LockTable};
use crate::error::{LockError, Result};
use crate::locks::info::{LockInfo, UNKNOWN_THREAD};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const TABLE: &str = "file";
const LOCK_EXTENSION: &str = "lock";

/// Owner reported for a lock file whose row cannot be read.
const UNKNOWN_OWNER: &str = "-";

/// Lock table stored as `<dir>/<encoded-name>.lock` files.
#[derive(Debug, Clone)]
pub struct FileLockTable {
    dir: PathBuf,
}

impl FileLockTable {
    /// Use `dir` as the table. The directory is created on first insert.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the lock files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the lock file for `name`.
    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_name(name), LOCK_EXTENSION))
    }

    /// Read and parse the row stored at `path`. `None` if there is no file.
    fn read_record(path: &Path) -> Result<Option<LockInfo>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LockError::backend(
                    TABLE,
                    format!("failed to read lock file '{}': {}", path.display(), e),
                ));
            }
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            LockError::backend(
                TABLE,
                format!("failed to parse lock file '{}': {}", path.display(), e),
            )
        })
    }

    /// The row at `path`, or a placeholder when the file exists but its row
    /// is unreadable.
    fn held_record(path: &Path, name: &str) -> Result<Option<LockInfo>> {
        match Self::read_record(path) {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "lock file has no readable row");
                let modified = match fs::metadata(path).and_then(|meta| meta.modified()) {
                    Ok(modified) => DateTime::<Utc>::from(modified),
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                    Err(_) => Utc::now(),
                };
                Ok(Some(LockInfo {
                    name: name.to_string(),
                    owner: UNKNOWN_OWNER.to_string(),
                    thread: UNKNOWN_THREAD.to_string(),
                    acquired_at: modified,
                }))
            }
        }
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                LockError::backend(
                    TABLE,
                    format!(
                        "failed to create locks directory '{}': {}",
                        self.dir.display(),
                        e
                    ),
                )
            })?;
        }
        Ok(())
    }
}

impl LockTable for FileLockTable {
    fn table_name(&self) -> &'static str {
        TABLE
    }

    fn insert(&self, record: &LockInfo) -> Result<InsertOutcome> {
        self.ensure_dir()?;
        let path = self.lock_path(&record.name);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(InsertOutcome::AlreadyExists);
            }
            Err(e) => {
                return Err(LockError::backend(
                    TABLE,
                    format!("failed to create lock file '{}': {}", path.display(), e),
                ));
            }
        };

        let json = serde_json::to_string_pretty(record).map_err(|e| {
            let _ = fs::remove_file(&path);
            LockError::backend(TABLE, format!("failed to serialize lock record: {}", e))
        })?;

        file.write_all(json.as_bytes()).map_err(|e| {
            // Clean up the lock file on write failure
            let _ = fs::remove_file(&path);
            LockError::backend(TABLE, format!("failed to write lock file: {}", e))
        })?;

        file.sync_all().map_err(|e| {
            let _ = fs::remove_file(&path);
            LockError::backend(TABLE, format!("failed to sync lock file: {}", e))
        })?;

        Ok(InsertOutcome::Inserted)
    }

    /// Owner-filtered deletes read the file and then remove it; the two steps
    /// are not atomic with respect to other writers of the same name.
    fn delete(&self, name: &str, owner: Option<&str>) -> Result<usize> {
        let path = self.lock_path(name);

        if let Some(owner) = owner {
            match Self::read_record(&path) {
                Ok(Some(record)) if record.owner == owner => {}
                Ok(_) => return Ok(0),
                // A corrupt file has no verifiable owner; leave it to a forced unlock.
                Err(e) => {
                    tracing::warn!(lock = name, error = %e, "cannot verify lock owner");
                    return Ok(0);
                }
            }
        }

        match fs::remove_file(&path) {
            Ok(()) => Ok(1),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(LockError::backend(
                TABLE,
                format!("failed to remove lock file '{}': {}", path.display(), e),
            )),
        }
    }

    fn select(&self, name: Option<&str>) -> Result<Vec<LockInfo>> {
        if let Some(name) = name {
            return Ok(Self::held_record(&self.lock_path(name), name)?
                .into_iter()
                .collect());
        }

        let mut locks = Vec::new();
        if !self.dir.exists() {
            return Ok(locks);
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            LockError::backend(
                TABLE,
                format!(
                    "failed to read locks directory '{}': {}",
                    self.dir.display(),
                    e
                ),
            )
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                LockError::backend(TABLE, format!("failed to read locks directory entry: {}", e))
            })?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some(LOCK_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            // None: released while listing
            if let Some(record) = Self::held_record(&path, &decode_name(stem))? {
                locks.push(record);
            }
        }

        Ok(locks)
    }
}

/// Map a lock name to a file stem.
fn encode_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Inverse of [`encode_name`]. Malformed escapes are kept as written.
fn decode_name(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(hex) = stem.get(i + 1..i + 3)
            && let Ok(byte) = u8::from_str_radix(hex, 16)
        {
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn create_table() -> (TempDir, FileLockTable) {
        let temp_dir = TempDir::new().unwrap();
        let table = FileLockTable::new(temp_dir.path().join("locks"));
        (temp_dir, table)
    }

    #[test]
    fn test_encode_name() {
        assert_eq!(encode_name("build-42"), "build-42");
        assert_eq!(encode_name("jobs/nightly import"), "jobs%2Fnightly%20import");
        assert_eq!(encode_name("a%b"), "a%25b");
        assert_eq!(encode_name("ü"), "%C3%BC");
    }

    #[test]
    fn test_decode_name_reverses_encoding() {
        for name in ["build-42", "jobs/nightly import", "a%b", "ü"] {
            assert_eq!(decode_name(&encode_name(name)), name);
        }
        assert_eq!(decode_name("100%"), "100%");
        assert_eq!(decode_name("%zz"), "%zz");
    }

    #[test]
    fn test_insert_creates_lock_file() {
        let (_temp_dir, table) = create_table();
        let record = LockInfo::new("R", "n1", "main");

        assert_eq!(table.insert(&record).unwrap(), InsertOutcome::Inserted);

        let path = table.lock_path("R");
        assert!(path.exists());
        let stored: LockInfo = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(stored, record);
    }

    #[test]
    fn test_insert_same_name_twice_reports_existing() {
        let (_temp_dir, table) = create_table();

        table.insert(&LockInfo::new("R", "n1", "main")).unwrap();
        let second = table.insert(&LockInfo::new("R", "n2", "main")).unwrap();

        assert_eq!(second, InsertOutcome::AlreadyExists);
        assert_eq!(table.select(Some("R")).unwrap()[0].owner, "n1");
    }

    #[test]
    fn test_names_with_separators_do_not_escape_dir() {
        let (_temp_dir, table) = create_table();

        table.insert(&LockInfo::new("../outside", "n1", "main")).unwrap();

        let path = table.lock_path("../outside");
        assert_eq!(path.parent().unwrap(), table.dir());
        assert_eq!(table.select(None).unwrap()[0].name, "../outside");
    }

    #[test]
    fn test_delete_with_wrong_owner_keeps_file() {
        let (_temp_dir, table) = create_table();
        table.insert(&LockInfo::new("R", "n1", "main")).unwrap();

        assert_eq!(table.delete("R", Some("n2")).unwrap(), 0);
        assert!(table.lock_path("R").exists());

        assert_eq!(table.delete("R", Some("n1")).unwrap(), 1);
        assert!(!table.lock_path("R").exists());
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let (_temp_dir, table) = create_table();

        assert_eq!(table.delete("ghost", None).unwrap(), 0);
        assert_eq!(table.delete("ghost", Some("n1")).unwrap(), 0);
    }

    #[test]
    fn test_select_empty_when_dir_missing() {
        let (_temp_dir, table) = create_table();
        assert!(table.select(None).unwrap().is_empty());
        assert!(table.select(Some("R")).unwrap().is_empty());
    }

    #[test]
    fn test_select_skips_foreign_files() {
        let (_temp_dir, table) = create_table();
        table.insert(&LockInfo::new("good", "n1", "main")).unwrap();
        fs::write(table.dir().join("notes.txt"), "hello").unwrap();

        let locks = table.select(None).unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].name, "good");
    }

    #[test]
    fn test_unreadable_lock_file_is_reported_as_held() {
        let (_temp_dir, table) = create_table();
        fs::create_dir_all(table.dir()).unwrap();
        // Holder crashed right after creating the file.
        fs::write(table.lock_path("jobs/import"), "").unwrap();
        fs::write(table.lock_path("broken"), "not json").unwrap();

        let mut locks = table.select(None).unwrap();
        locks.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(locks.len(), 2);
        assert_eq!(locks[0].name, "broken");
        assert_eq!(locks[1].name, "jobs/import");
        assert_eq!(locks[1].owner, UNKNOWN_OWNER);
        assert_eq!(locks[1].thread, UNKNOWN_THREAD);
        assert!(locks[1].age() < chrono::Duration::minutes(5));

        let single = table.select(Some("jobs/import")).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].owner, UNKNOWN_OWNER);

        let outcome = table.insert(&LockInfo::new("jobs/import", "n1", "main")).unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyExists);
    }

    #[test]
    fn test_forced_delete_removes_corrupt_file() {
        let (_temp_dir, table) = create_table();
        fs::create_dir_all(table.dir()).unwrap();
        fs::write(table.lock_path("broken"), "not json").unwrap();

        assert_eq!(table.delete("broken", Some("n1")).unwrap(), 0);
        assert_eq!(table.delete("broken", None).unwrap(), 1);
    }

    #[test]
    fn test_acquired_at_survives_storage() {
        let (_temp_dir, table) = create_table();
        let mut record = LockInfo::new("old", "n1", "main");
        record.acquired_at = Utc::now() - Duration::minutes(90);
        table.insert(&record).unwrap();

        let stored = table.select(Some("old")).unwrap().remove(0);
        assert_eq!(stored.acquired_at, record.acquired_at);
        assert!(stored.is_stale(std::time::Duration::from_secs(30 * 60)));
    }
}
