//! Redis-backed lock cache.
//!
//! A lock is the key `<prefix><name>` holding the JSON [`CacheLock`], set
//! with `SET .. NX PX <ttl>`. Redis has no blocking variant of that, so
//! waiting polls with [`CACHE_BACKOFF`](super::memory::CACHE_BACKOFF).

use super::memory::CACHE_BACKOFF;
use super::{CacheLock, LockCache};
use crate::error::{LockError, Result};
use crate::locks::backoff::{Acquire, Backoff, retry_acquire};
use chrono::Utc;
use std::time::Duration;

const CACHE: &str = "redis";

/// Delete the key only if the stored owner matches.
const RELEASE_SCRIPT: &str = r#"
local value = redis.call('GET', KEYS[1])
if not value then
    return 0
end
if cjson.decode(value).owner == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

const SCAN_BATCH: usize = 100;

/// Redis rejects expiries that overflow its signed millisecond clock.
const MAX_TTL_MS: u64 = (i64::MAX / 2) as u64;

/// `PX` argument for `ttl`. `PX` rejects 0, so sub-millisecond TTLs round up.
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis())
        .unwrap_or(u64::MAX)
        .clamp(1, MAX_TTL_MS)
}

fn redis_error(e: ::redis::RedisError) -> LockError {
    LockError::backend(CACHE, e.to_string())
}

/// Lock cache talking to a Redis server over the synchronous client.
pub struct RedisLockCache {
    client: ::redis::Client,
    key_prefix: String,
    node: String,
    backoff: Backoff,
}

impl RedisLockCache {
    /// Prepare a client for `url`. No connection is made until first use.
    pub fn new(url: &str, key_prefix: impl Into<String>, node: impl Into<String>) -> Result<Self> {
        let client = ::redis::Client::open(url)
            .map_err(|e| LockError::ConfigError(format!("invalid redis.url '{}': {}", url, e)))?;
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
            node: node.into(),
            backoff: CACHE_BACKOFF,
        })
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }

    fn connection(&self) -> Result<::redis::Connection> {
        self.client.get_connection().map_err(redis_error)
    }

    fn acquire_once(
        &self,
        con: &mut ::redis::Connection,
        name: &str,
        ttl: Duration,
    ) -> Result<Acquire> {
        let payload = serde_json::to_string(&CacheLock {
            name: name.to_string(),
            owner: self.node.clone(),
            since: Utc::now(),
        })
        .map_err(|e| LockError::backend(CACHE, format!("failed to encode lock: {}", e)))?;

        let reply: Option<String> = ::redis::cmd("SET")
            .arg(self.key(name))
            .arg(payload)
            .arg("NX")
            .arg("PX")
            .arg(px_millis(ttl))
            .query(con)
            .map_err(redis_error)?;

        Ok(match reply {
            Some(_) => Acquire::Acquired,
            None => Acquire::AlreadyHeld,
        })
    }

    fn scan_keys(&self, con: &mut ::redis::Connection) -> Result<Vec<String>> {
        let pattern = format!("{}*", self.key_prefix);
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query(con)
                .map_err(redis_error)?;
            keys.extend(batch);
            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }
}

impl LockCache for RedisLockCache {
    fn cache_name(&self) -> &'static str {
        CACHE
    }

    fn try_acquire(
        &self,
        name: &str,
        acquire_timeout: Option<Duration>,
        ttl: Duration,
    ) -> Result<bool> {
        let mut con = self.connection()?;
        Ok(retry_acquire(CACHE, name, acquire_timeout, self.backoff, |name| {
            self.acquire_once(&mut con, name, ttl)
        }))
    }

    fn release(&self, name: &str, force: bool) -> Result<()> {
        let mut con = self.connection()?;
        let key = self.key(name);
        let removed: i64 = if force {
            ::redis::cmd("DEL").arg(&key).query(&mut con)
        } else {
            ::redis::Script::new(RELEASE_SCRIPT)
                .key(&key)
                .arg(&self.node)
                .invoke(&mut con)
        }
        .map_err(redis_error)?;
        tracing::trace!(lock = name, force, removed, "redis release");
        Ok(())
    }

    fn is_held(&self, name: &str) -> Result<bool> {
        let mut con = self.connection()?;
        ::redis::cmd("EXISTS")
            .arg(self.key(name))
            .query(&mut con)
            .map_err(redis_error)
    }

    fn list(&self) -> Result<Vec<CacheLock>> {
        let mut con = self.connection()?;
        let mut locks = Vec::new();
        for key in self.scan_keys(&mut con)? {
            let value: Option<String> = ::redis::cmd("GET")
                .arg(&key)
                .query(&mut con)
                .map_err(redis_error)?;
            // Expired between SCAN and GET.
            let Some(value) = value else { continue };
            match serde_json::from_str::<CacheLock>(&value) {
                Ok(lock) => locks.push(lock),
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping unreadable lock entry"),
            }
        }
        Ok(locks)
    }

    fn ping(&self) -> Result<()> {
        let mut con = self.connection()?;
        ::redis::cmd("PING")
            .query::<String>(&mut con)
            .map(|_| ())
            .map_err(redis_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_prefix() {
        let cache = RedisLockCache::new("redis://127.0.0.1/", "fleetlock:", "n1").unwrap();
        assert_eq!(cache.key("nightly-import"), "fleetlock:nightly-import");
    }

    #[test]
    fn px_millis_stays_in_range() {
        assert_eq!(px_millis(Duration::from_micros(10)), 1);
        assert_eq!(px_millis(Duration::from_secs(30)), 30_000);
        assert_eq!(px_millis(Duration::MAX), MAX_TTL_MS);
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        let err = RedisLockCache::new("not a url", "fleetlock:", "n1")
            .err()
            .unwrap();
        assert!(matches!(err, LockError::ConfigError(_)));
    }

    #[test]
    fn unreachable_server_fails_ping() {
        // Port 1 is reserved and never runs Redis.
        let cache = RedisLockCache::new("redis://127.0.0.1:1/", "fleetlock:", "n1").unwrap();
        assert!(cache.ping().is_err());
    }
}
