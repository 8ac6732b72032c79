//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::BackendKind;
use crate::error::{LockError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FLEETLOCK_CONFIG";

/// Config file picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "fleetlock.yaml";

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(LockError::ConfigError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Resolve the effective configuration.
    ///
    /// Lookup order: the explicit path (must exist), then `FLEETLOCK_CONFIG`
    /// (must exist), then `fleetlock.yaml` in the working directory if present,
    /// then built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV_VAR)
                .map(PathBuf::from)
                .or_else(|| {
                    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                    local.exists().then_some(local)
                }),
        };

        match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(path)
            }
            None => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LockError::ConfigError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `stale_threshold_minutes`, `default_lock_ttl_secs` and `metrics.interval_secs` must be positive
    /// - `node_name`, when given, must be non-empty
    /// - the `file` backend needs a non-empty `file_store.dir`
    /// - the `redis` backend needs `redis.url`
    pub fn validate(&self) -> Result<()> {
        if self.stale_threshold_minutes == 0 {
            return Err(LockError::ConfigError(
                "stale_threshold_minutes must be greater than 0".to_string(),
            ));
        }

        if self.default_lock_ttl_secs == 0 {
            return Err(LockError::ConfigError(
                "default_lock_ttl_secs must be greater than 0".to_string(),
            ));
        }

        if self.metrics.interval_secs == 0 {
            return Err(LockError::ConfigError(
                "metrics.interval_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(node) = &self.node_name
            && node.trim().is_empty()
        {
            return Err(LockError::ConfigError(
                "node_name must not be empty when set".to_string(),
            ));
        }

        match self.backend {
            BackendKind::File if self.file_store.dir.as_os_str().is_empty() => {
                Err(LockError::ConfigError(
                    "backend 'file' requires file_store.dir".to_string(),
                ))
            }
            BackendKind::Redis if self.redis.url.is_none() => Err(LockError::ConfigError(
                "backend 'redis' requires redis.url".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Age after which a held lock is reported as stale.
    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs(u64::from(self.stale_threshold_minutes) * 60)
    }

    /// TTL used by expiring backends when no lock timeout is given.
    pub fn default_lock_ttl(&self) -> Duration {
        Duration::from_secs(self.default_lock_ttl_secs)
    }

    /// Interval between two metric snapshots.
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics.interval_secs)
    }
}
