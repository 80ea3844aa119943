//! Configuration and status structures for the semaphore.

use super::record::format_age;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default age after which a lock is considered abandoned.
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default polling interval for blocking operations.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Semaphore behavior settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemaphoreConfig {
    /// Age after which an existing record may be reclaimed. `None` disables
    /// age-based staleness.
    pub stale_timeout: Option<Duration>,

    /// Sleep between attempts in blocking operations.
    pub retry_interval: Duration,

    /// Wait budget for [`acquire`](super::Semaphore::acquire). `None` waits
    /// forever.
    pub acquire_timeout: Option<Duration>,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            stale_timeout: Some(DEFAULT_STALE_TIMEOUT),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            acquire_timeout: None,
        }
    }
}

/// Point-in-time view of a lock file.
#[derive(Debug, Clone, Serialize)]
pub struct LockStatus {
    /// The lock file path.
    pub path: PathBuf,

    /// Whether a lock file is present.
    pub locked: bool,

    /// Holder pid, if the record parsed.
    pub pid: Option<u32>,

    /// Acquisition time in Unix seconds.
    pub timestamp: Option<u64>,

    /// Seconds since acquisition.
    pub age_seconds: Option<u64>,

    pub tag: Option<String>,

    /// Liveness of the holder; `None` when unknown or unsupported.
    pub holder_alive: Option<bool>,

    /// Whether the record is eligible for reclamation.
    pub stale: bool,

    /// A lock file exists but its contents could not be parsed.
    pub unparseable: bool,
}

impl LockStatus {
    pub(super) fn free(path: PathBuf) -> Self {
        Self {
            path,
            locked: false,
            pid: None,
            timestamp: None,
            age_seconds: None,
            tag: None,
            holder_alive: None,
            stale: false,
            unparseable: false,
        }
    }

    /// Human-readable age, if known.
    pub fn age_string(&self) -> Option<String> {
        self.age_seconds.map(|s| format_age(Duration::from_secs(s)))
    }
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.locked {
            return write!(f, "{} (free)", self.path.display());
        }
        if self.unparseable {
            return write!(f, "{} (locked by unknown holder)", self.path.display());
        }
        write!(
            f,
            "{} (pid: {}, age: {}{}{})",
            self.path.display(),
            self.pid.map(|p| p.to_string()).unwrap_or_default(),
            self.age_string().unwrap_or_default(),
            self.tag
                .as_ref()
                .map(|t| format!(", tag: {}", t))
                .unwrap_or_default(),
            if self.stale { ", STALE" } else { "" }
        )
    }
}

/// Cooperative cancellation flag for blocking waits.
///
/// Clones share the same flag, so one thread (or a signal handler) can stop
/// another thread's `acquire`/`wait`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
