//! Configuration types and defaults for fleetlock.
//!
//! This module defines enums, nested sections, and default value functions
//! used by the Config struct.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which lock backend the process should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Use the cluster cache if one is configured and reachable, else in-process (default).
    #[default]
    Smart,
    /// Process-local mutex map. Never cluster-safe.
    Local,
    /// Shared lock table made of one file per lock in a shared directory.
    File,
    /// Redis TTL cache (requires the `redis` feature).
    Redis,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Local => "local",
            Self::File => "file",
            Self::Redis => "redis",
        }
    }
}

/// Settings for the file-backed lock table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Directory holding one `.lock` file per held lock. Must be shared by all nodes.
    pub dir: PathBuf,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            dir: default_file_store_dir(),
        }
    }
}

/// Settings for the Redis lock cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/`. Unset means "no cluster cache".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Prefix applied to every lock key.
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: default_redis_key_prefix(),
        }
    }
}

/// Settings for periodic metric emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between two metric snapshots.
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_metrics_interval_secs(),
        }
    }
}

// Default value functions for serde
pub(crate) fn default_stale_threshold_minutes() -> u32 {
    30
}
pub(crate) fn default_lock_ttl_secs() -> u64 {
    30 * 60
}
pub(crate) fn default_file_store_dir() -> PathBuf {
    PathBuf::from(".fleetlock/locks")
}
pub(crate) fn default_redis_key_prefix() -> String {
    "fleetlock:".to_string()
}
pub(crate) fn default_metrics_interval_secs() -> u64 {
    60
}
