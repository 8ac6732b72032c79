//! Builds the configured lock backend.

use crate::config::{BackendKind, Config};
use crate::error::Result;
use crate::locks::cache::LockCache;
use crate::locks::table::FileLockTable;
use crate::locks::{
    LocalLockManager, LockManager, LockSettings, Locks, SmartLockManager, StorageLockManager,
};
use crate::node::node_name;
use std::sync::Arc;

/// Create the lock manager selected by `config.backend`.
pub fn build_manager(config: &Config) -> Result<Arc<dyn LockManager>> {
    let node = node_name(config.node_name.as_deref());
    tracing::debug!(backend = config.backend.as_str(), node = %node, "building lock backend");

    let manager: Arc<dyn LockManager> = match config.backend {
        BackendKind::Local => Arc::new(LocalLockManager::new()),
        BackendKind::File => {
            let table = Arc::new(FileLockTable::new(&config.file_store.dir));
            Arc::new(StorageLockManager::new(table, node))
        }
        BackendKind::Redis => redis_manager(config, node)?,
        BackendKind::Smart => Arc::new(
            SmartLockManager::new(configured_cache(config, node)?)
                .with_default_ttl(config.default_lock_ttl()),
        ),
    };
    Ok(manager)
}

/// Create the [`Locks`] facade for `config`.
pub fn build_locks(config: &Config) -> Result<Locks> {
    let settings = LockSettings {
        stale_threshold: config.stale_threshold(),
    };
    Ok(Locks::with_settings(build_manager(config)?, settings))
}

#[cfg(feature = "redis")]
fn configured_cache(config: &Config, node: String) -> Result<Option<Arc<dyn LockCache>>> {
    use crate::locks::cache::RedisLockCache;

    let Some(url) = config.redis.url.as_deref() else {
        return Ok(None);
    };
    let cache = RedisLockCache::new(url, config.redis.key_prefix.clone(), node)?;
    Ok(Some(Arc::new(cache)))
}

#[cfg(not(feature = "redis"))]
fn configured_cache(config: &Config, _node: String) -> Result<Option<Arc<dyn LockCache>>> {
    if config.redis.url.is_some() {
        tracing::warn!("redis.url is set but fleetlock was built without the redis feature");
    }
    Ok(None)
}

#[cfg(feature = "redis")]
fn redis_manager(config: &Config, node: String) -> Result<Arc<dyn LockManager>> {
    use crate::error::LockError;
    use crate::locks::CacheLockManager;

    let cache = configured_cache(config, node)?
        .ok_or_else(|| LockError::ConfigError("backend 'redis' requires redis.url".to_string()))?;
    Ok(Arc::new(
        CacheLockManager::new(cache).with_default_ttl(config.default_lock_ttl()),
    ))
}

#[cfg(not(feature = "redis"))]
fn redis_manager(_config: &Config, _node: String) -> Result<Arc<dyn LockManager>> {
    Err(crate::error::LockError::ConfigError(
        "backend 'redis' requires fleetlock built with the redis feature".to_string(),
    ))
}
