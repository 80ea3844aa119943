//! File-based semaphore.
//!
//! A lock is a small text file at a well-known path. It exists if and only if
//! some process holds the resource (subject to staleness). The pieces, leaves
//! first:
//!
//! - [`record`]: the `key=value` lock record codec
//! - [`staleness`]: age and liveness checks on an existing record
//! - [`Semaphore`]: try-acquire, blocking acquire, force-release, status
//! - [`LockGuard`]: scope-bound ownership that releases on every exit path
//!
//! Lock files are created with exclusive-create semantics (see
//! [`crate::fs::create_exclusive`]) so only one process can hold a given path
//! at a time.
//!
//! # Stale Locks
//!
//! A record older than the stale timeout, or whose holder pid is no longer
//! running, may be reclaimed by the next acquirer. An unparseable record is
//! never considered stale: the primitive fails closed.

mod guard;
pub mod record;
mod semaphore;
pub mod staleness;
mod types;


// Re-export public API
pub use guard::LockGuard;
pub use record::LockRecord;
pub use semaphore::Semaphore;
pub use staleness::{LivenessProbe, NoProbe, StaleReason, SystemProbe};
pub use types::{
    CancelToken, DEFAULT_RETRY_INTERVAL, DEFAULT_STALE_TIMEOUT, LockStatus, SemaphoreConfig,
};
