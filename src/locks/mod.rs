//! Locking subsystem for fleetlock.
//!
//! Named, mutually exclusive locks shared by a fleet of nodes. Every backend
//! implements [`LockManager`]:
//! - [`LocalLockManager`]: in-process map, single node only
//! - [`StorageLockManager`]: rows in a shared [`LockTable`](table::LockTable),
//!   e.g. lock files in a shared directory
//! - [`CacheLockManager`]: keys with a TTL in an external
//!   [`LockCache`](cache::LockCache)
//! - [`SmartLockManager`]: the cache when reachable, local otherwise
//!
//! Application code goes through the [`Locks`] facade.
//!
//! # Lock Lifecycle
//!
//! A lock exists exactly as long as its record does. It is created by a
//! successful atomic acquire and removed by its owner, by a forced unlock, or
//! by TTL expiry on cache backends. Locks never migrate between backends.
//!
//! # RAII Guards
//!
//! [`Locks::lock_guard`] and [`Locks::try_locked`] release through a
//! [`LockGuard`] when it is dropped, including during a panic. If releasing
//! fails during drop, a warning is logged but the program does not crash.

pub mod backoff;
pub mod cache;
mod cached;
mod facade;
mod guard;
mod info;
mod local;
mod manager;
mod smart;
mod storage;
pub mod table;

// Re-export public API
pub use backoff::{Acquire, Backoff};
pub use cached::{CacheLockManager, DEFAULT_LOCK_TTL};
pub use facade::{DEFAULT_STALE_THRESHOLD, LockSettings, Locks};
pub use guard::LockGuard;
pub use info::{LOCAL_OWNER, LockInfo, UNKNOWN_THREAD};
pub use local::LocalLockManager;
pub use manager::LockManager;
pub use smart::{BackendChoice, SmartLockManager, select_backend};
pub use storage::StorageLockManager;
