//! Exit code constants for the fleetlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Backend failure (storage or cache unavailable)
//! - 3: Lock could not be acquired

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Backend failure: the lock table or cache could not be reached or read.
pub const BACKEND_FAILURE: i32 = 2;

/// Lock acquisition failure: the named lock is held elsewhere.
pub const LOCK_FAILURE: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, BACKEND_FAILURE, LOCK_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
