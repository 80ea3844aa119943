//! Error types for filesem.
//!
//! Uses thiserror for derive macros. Every failure is returned as a value;
//! contention and timeouts are ordinary outcomes the caller is expected to
//! handle, not bugs.

use crate::exit_codes;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for semaphore operations.
///
/// Each variant maps to a CLI exit code via [`SemaphoreError::exit_code`].
#[derive(Error, Debug)]
pub enum SemaphoreError {
    /// The lock file exists and is held by a live (or unknown) holder.
    ///
    /// Both fields are `None` when the existing record could not be parsed.
    #[error("lock already held{}{}", fmt_holder(.holder_id), fmt_since(.locked_since))]
    AlreadyLocked {
        holder_id: Option<u32>,
        locked_since: Option<u64>,
    },

    /// The configured wait budget was exhausted.
    #[error("timed out waiting for lock")]
    Timeout,

    /// The caller cancelled a blocking wait.
    #[error("wait for lock was cancelled")]
    Cancelled,

    /// The lock path cannot be used (empty, no file name, missing parent).
    #[error("invalid lock path: {0}")]
    InvalidPath(String),

    /// Underlying filesystem failure.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Lock file contents do not match the record format.
    #[error("failed to parse lock record: {0}")]
    ParseError(String),

    /// Release was attempted while this holder does not own the lock.
    #[error("lock is not held by this guard")]
    NotLocked,
}

fn fmt_holder(holder_id: &Option<u32>) -> String {
    match holder_id {
        Some(pid) => format!(" by pid {}", pid),
        None => " by an unknown holder".to_string(),
    }
}

fn fmt_since(locked_since: &Option<u64>) -> String {
    match locked_since {
        Some(ts) => format!(" since {}", ts),
        None => String::new(),
    }
}

impl SemaphoreError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SemaphoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SemaphoreError::AlreadyLocked { .. }
            | SemaphoreError::Timeout
            | SemaphoreError::Cancelled => exit_codes::LOCK_UNAVAILABLE,
            SemaphoreError::InvalidPath(_) => exit_codes::USAGE_ERROR,
            SemaphoreError::Io { .. }
            | SemaphoreError::ParseError(_)
            | SemaphoreError::NotLocked => exit_codes::IO_FAILURE,
        }
    }
}

/// Result type alias for semaphore operations.
pub type Result<T> = std::result::Result<T, SemaphoreError>;
