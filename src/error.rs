//! Error types for fleetlock.
//!
//! Uses thiserror for derive macros. Contention is never represented here:
//! a lock that is already held is a `false` from `try_lock`, not an error.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for fleetlock operations.
///
/// Each variant maps to a specific process exit code for the CLI.
#[derive(Error, Debug)]
pub enum LockError {
    /// User provided invalid arguments.
    #[error("{0}")]
    UserError(String),

    /// Configuration could not be read, parsed or validated.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A storage or cache backend failed (I/O, network, serialization).
    #[error("Backend error ({backend}): {message}")]
    BackendError {
        backend: &'static str,
        message: String,
    },

    /// A lock could not be acquired within the acquire timeout.
    #[error("Lock not acquired: {0}")]
    NotAcquired(String),

    /// A command run under a lock exited unsuccessfully; its code is passed on.
    #[error("Command exited with code {0}")]
    CommandFailed(i32),
}

impl LockError {
    /// Shorthand for building a [`LockError::BackendError`].
    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        LockError::BackendError {
            backend,
            message: message.into(),
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockError::UserError(_) => exit_codes::USER_ERROR,
            LockError::ConfigError(_) => exit_codes::USER_ERROR,
            LockError::BackendError { .. } => exit_codes::BACKEND_FAILURE,
            LockError::NotAcquired(_) => exit_codes::LOCK_FAILURE,
            LockError::CommandFailed(code) => *code,
        }
    }
}

/// Result type alias for fleetlock operations.
pub type Result<T> = std::result::Result<T, LockError>;
