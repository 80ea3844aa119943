//! RAII guard for an acquired lock.

use super::record::LockRecord;
use crate::error::{Result, SemaphoreError};
use crate::fs::remove_if_unchanged;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Proof of one successful acquisition.
///
/// When dropped, the lock file is removed if it still carries this guard's
/// record. If removal fails, a warning is logged but no panic occurs. The
/// guard is deliberately not `Clone`: code that needs to know whether the
/// resource is locked should ask the [`Semaphore`](super::Semaphore).
#[derive(Debug)]
#[must_use = "dropping the guard releases the lock immediately"]
pub struct LockGuard {
    /// Path to the lock file.
    path: PathBuf,

    /// The record written at acquisition.
    record: LockRecord,

    /// Exact bytes written, used to recognize our own file at release.
    contents: String,

    /// Whether the lock has been released (or detached).
    released: bool,
}

impl LockGuard {
    pub(super) fn new(path: PathBuf, record: LockRecord, contents: String) -> Self {
        Self {
            path,
            record,
            contents,
            released: false,
        }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The record this guard wrote.
    pub fn record(&self) -> &LockRecord {
        &self.record
    }

    /// Whether `release` has already run.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release the lock now, reporting errors explicitly.
    ///
    /// The first call removes the lock file. It returns `NotLocked` when the
    /// file is gone or has been replaced by another holder (for example after
    /// a force-release); a foreign file is left untouched. Later calls are
    /// no-ops returning `Ok(())`. An `Io` error leaves the guard unreleased.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }

        // An I/O failure leaves the guard armed so `Drop` tries again
        let removed = remove_if_unchanged(&self.path, self.contents.as_bytes())
            .map_err(|e| SemaphoreError::io(&self.path, e))?;
        self.released = true;

        if removed {
            debug!(path = %self.path.display(), "lock released");
            Ok(())
        } else {
            Err(SemaphoreError::NotLocked)
        }
    }

    /// Give up the guard without removing the lock file.
    ///
    /// Responsibility for the on-disk record passes to the caller, who must
    /// eventually release it through another handle (or let it go stale).
    pub fn detach(mut self) -> LockRecord {
        self.released = true;
        self.record.clone()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.release() {
            Ok(()) => {}
            Err(SemaphoreError::NotLocked) => {
                warn!(
                    path = %self.path.display(),
                    "lock file was removed or taken over before release"
                );
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to release lock");
            }
        }
    }
}
