//! filesem: a cross-process semaphore built on exclusive file creation.
//!
//! A lock is a small text file at a well-known path holding the holder's pid,
//! the acquisition time and an optional tag:
//!
//! ```text
//! pid=4242
//! timestamp=1700000000
//! tag=nightly-backup
//! ```
//!
//! Any process able to create files exclusively can cooperate, whatever it
//! is written in. Locks left behind by crashed holders are reclaimed once
//! they are older than the stale timeout or their holder is no longer running.
//!
//! ```no_run
//! use filesem::{Semaphore, SemaphoreError};
//! use std::time::Duration;
//!
//! let sem = Semaphore::with_defaults("/tmp/nightly.lock")?;
//! match sem.try_acquire() {
//!     Ok(_guard) => {
//!         // exclusive work; the lock file is removed when `_guard` drops
//!     }
//!     Err(SemaphoreError::AlreadyLocked { holder_id, .. }) => {
//!         eprintln!("busy (holder {:?})", holder_id);
//!     }
//!     Err(e) => return Err(e),
//! }
//!
//! let guard = sem.acquire_timeout(Duration::from_secs(5))?;
//! drop(guard);
//! # Ok::<(), SemaphoreError>(())
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod locks;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, SemaphoreError};
pub use locks::{
    CancelToken, DEFAULT_RETRY_INTERVAL, DEFAULT_STALE_TIMEOUT, LivenessProbe, LockGuard,
    LockRecord, LockStatus, NoProbe, Semaphore, SemaphoreConfig, StaleReason, SystemProbe,
};
