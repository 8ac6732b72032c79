//! Node and thread identity recorded as lock owner.

use std::thread;

/// Environment variable overriding the node name.
pub const NODE_NAME_ENV_VAR: &str = "FLEETLOCK_NODE_NAME";

/// Resolve the stable name of this node.
///
/// Order: the configured name, then `FLEETLOCK_NODE_NAME`, then the machine
/// hostname, then `"unknown"`.
pub fn node_name(configured: Option<&str>) -> String {
    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    if let Ok(name) = std::env::var(NODE_NAME_ENV_VAR)
        && !name.trim().is_empty()
    {
        return name.trim().to_string();
    }

    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Name of the calling thread, falling back to its id for unnamed threads.
pub fn current_thread_name() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}
