//! Exit code constants for the filesem CLI.
//!
//! Collaborating tools consume the lock purely through these codes:
//! - 0: Success (acquired, released, free, or status reported)
//! - 1: Lock unavailable (already held, timeout)
//! - 2: Usage error (bad arguments, invalid path, bad config)
//! - 3: I/O or system failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// The lock is held by someone else, or the wait budget ran out.
pub const LOCK_UNAVAILABLE: i32 = 1;

/// Bad arguments, unusable lock path, or invalid configuration.
pub const USAGE_ERROR: i32 = 2;

/// Filesystem or system failure.
pub const IO_FAILURE: i32 = 3;
