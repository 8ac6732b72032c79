//! Snapshot of a single held lock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Owner reported by the in-process backend.
pub const LOCAL_OWNER: &str = "(local)";

/// Thread reported by backends that cannot track thread identity.
pub const UNKNOWN_THREAD: &str = "-";

/// Information about a held lock.
///
/// This is both the snapshot handed to callers and the row shape stored by
/// lock tables. Existence of a record is what "locked" means; there is no
/// separate flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// The lock name.
    pub name: String,

    /// Node or process holding the lock.
    pub owner: String,

    /// Thread within the owner that acquired the lock.
    pub thread: String,

    /// When the lock was acquired. Never changes after creation.
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create a record acquired now.
    pub fn new(name: impl Into<String>, owner: impl Into<String>, thread: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            thread: thread.into(),
            acquired_at: Utc::now(),
        }
    }

    /// How long the lock has been held.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }

    /// Check if the lock has been held longer than `threshold`.
    pub fn is_stale(&self, threshold: std::time::Duration) -> bool {
        self.age()
            .to_std()
            .map(|age| age > threshold)
            .unwrap_or(false)
    }
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, thread: {}, age: {})",
            self.name,
            self.owner,
            self.thread,
            self.age_string()
        )
    }
}
