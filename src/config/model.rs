//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a fleetlock process.
///
/// This struct represents the contents of `fleetlock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Backend selection
    // =========================================================================
    /// Which backend to use.
    #[serde(default)]
    pub backend: BackendKind,

    /// Identity recorded as lock owner. Falls back to `FLEETLOCK_NODE_NAME`, then hostname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Minutes after which a held lock counts as stale in metrics and listings.
    #[serde(default = "default_stale_threshold_minutes")]
    pub stale_threshold_minutes: u32,

    /// TTL applied by expiring backends when the caller gives no lock timeout.
    #[serde(default = "default_lock_ttl_secs")]
    pub default_lock_ttl_secs: u64,

    // =========================================================================
    // Backend settings
    // =========================================================================
    #[serde(default)]
    pub file_store: FileStoreConfig,

    #[serde(default)]
    pub redis: RedisConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            node_name: None,
            stale_threshold_minutes: default_stale_threshold_minutes(),
            default_lock_ttl_secs: default_lock_ttl_secs(),
            file_store: FileStoreConfig::default(),
            redis: RedisConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
