//! Structured logging with tracing.
//!
//! Log records go to stderr so command output on stdout stays parseable.

use crate::error::{LockError, Result};
use tracing::Level;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding an `EnvFilter` directive, e.g. `fleetlock=debug`.
pub const LOG_ENV_VAR: &str = "FLEETLOCK_LOG";

/// Level used when neither `--log-level` nor `FLEETLOCK_LOG` is given.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Install the global subscriber.
///
/// An explicit `level` wins over `FLEETLOCK_LOG`.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::new(parse_log_level(level)?.as_str()),
        None => EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
    };

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true);

    Registry::default()
        .with(filter)
        .with(stderr)
        .try_init()
        .map_err(|e| LockError::ConfigError(format!("failed to initialize logging: {}", e)))
}

/// Parse log level string to tracing Level.
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(LockError::UserError(format!(
            "invalid log level '{}' (expected trace, debug, info, warn or error)",
            level
        ))),
    }
}
