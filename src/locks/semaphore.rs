//! The semaphore façade: acquisition, release, and status queries.
//!
//! A `Semaphore` is only a path plus configuration. All shared state lives in
//! the lock file, so handles in different processes (or written in different
//! languages) coordinate as long as they all use exclusive create and the
//! same record format.
//!
//! Waiters are not ordered. When a lock is freed, whichever poller attempts
//! the exclusive create first wins; FIFO fairness would need coordination
//! beyond a single file.

use super::guard::LockGuard;
use super::record::{LockRecord, unix_now};
use super::staleness::{LivenessProbe, SystemProbe, stale_reason};
use super::types::{CancelToken, LockStatus, SemaphoreConfig};
use crate::error::{Result, SemaphoreError};
use crate::fs::{CreateOutcome, create_exclusive, remove_if_exists, remove_if_unchanged};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// What currently sits at the lock path.
enum Existing {
    Missing,
    Unparseable,
    Record { record: LockRecord, raw: Vec<u8> },
}

static CLAIM_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File-based semaphore bound to one lock path.
#[derive(Debug, Clone)]
pub struct Semaphore {
    path: PathBuf,
    config: SemaphoreConfig,
    probe: Arc<dyn LivenessProbe>,
}

impl Semaphore {
    /// Create a semaphore for `path`.
    ///
    /// # Returns
    ///
    /// * `Ok(Semaphore)` - The path is usable
    /// * `Err(SemaphoreError::InvalidPath)` - Empty path, no file name, the
    ///   path is a directory, or the parent directory does not exist
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filesem::{Semaphore, SemaphoreConfig};
    ///
    /// let semaphore = Semaphore::new("/tmp/nightly.lock", SemaphoreConfig::default())?;
    /// {
    ///     let _guard = semaphore.try_acquire()?;
    ///     // critical section
    /// }
    /// # Ok::<(), filesem::SemaphoreError>(())
    /// ```
    pub fn new(path: impl AsRef<Path>, config: SemaphoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        validate_path(&path)?;

        Ok(Self {
            path,
            config,
            probe: Arc::new(SystemProbe),
        })
    }

    /// Create a semaphore with default configuration.
    pub fn with_defaults(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(path, SemaphoreConfig::default())
    }

    /// Replace the liveness probe used for staleness decisions.
    pub fn with_probe(mut self, probe: impl LivenessProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &SemaphoreConfig {
        &self.config
    }

    /// Whether a lock file is currently present (stale or not).
    pub fn is_locked(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok()
    }

    /// Try to acquire the lock for the current process without blocking.
    pub fn try_acquire(&self) -> Result<LockGuard> {
        self.try_acquire_with(LockRecord::for_current_process(None))
    }

    /// Try to acquire the lock, writing `record` as the claim.
    ///
    /// # Returns
    ///
    /// * `Ok(LockGuard)` - The lock file was created with `record`
    /// * `Err(SemaphoreError::AlreadyLocked)` - A live or unparseable record
    ///   holds the path, or another process won the race after a stale
    ///   record was reclaimed
    /// * `Err(SemaphoreError::Io)` - Filesystem failure
    pub fn try_acquire_with(&self, record: LockRecord) -> Result<LockGuard> {
        let contents = claim_contents(&record);

        if self.create(&contents)? == CreateOutcome::Created {
            return Ok(self.acquired(record, contents));
        }

        match self.read_existing()? {
            Existing::Missing => {
                debug!(path = %self.path.display(), "lock vanished after collision, retrying");
            }
            Existing::Unparseable => {
                debug!(path = %self.path.display(), "existing lock is unparseable, treating as held");
                return Err(SemaphoreError::AlreadyLocked {
                    holder_id: None,
                    locked_since: None,
                });
            }
            Existing::Record { record: existing, raw } => {
                let Some(reason) =
                    stale_reason(&existing, unix_now(), self.config.stale_timeout, &*self.probe)
                else {
                    return Err(already_locked(&existing));
                };

                info!(
                    path = %self.path.display(),
                    holder = existing.holder_id,
                    %reason,
                    "reclaiming stale lock"
                );
                remove_if_unchanged(&self.path, &raw)
                    .map_err(|e| SemaphoreError::io(&self.path, e))?;
            }
        }

        // Exactly one retry: if we lose again, someone else legitimately holds it
        if self.create(&contents)? == CreateOutcome::Created {
            return Ok(self.acquired(record, contents));
        }

        match self.read_existing()? {
            Existing::Record { record: current, .. } => Err(already_locked(&current)),
            Existing::Missing | Existing::Unparseable => Err(SemaphoreError::AlreadyLocked {
                holder_id: None,
                locked_since: None,
            }),
        }
    }

    /// Acquire the lock, blocking up to `config.acquire_timeout`.
    pub fn acquire(&self) -> Result<LockGuard> {
        self.acquire_with(
            LockRecord::for_current_process(None),
            self.config.acquire_timeout,
            &CancelToken::new(),
        )
    }

    /// Acquire with a specific timeout, overriding the configured one.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<LockGuard> {
        self.acquire_with(
            LockRecord::for_current_process(None),
            Some(timeout),
            &CancelToken::new(),
        )
    }

    /// Acquire the lock by polling `try_acquire_with` every retry interval.
    ///
    /// The record's timestamp is refreshed on every attempt so a long wait
    /// never produces an already-aged claim. `timeout: None` waits forever.
    ///
    /// # Returns
    ///
    /// * `Ok(LockGuard)` - Acquired
    /// * `Err(SemaphoreError::Timeout)` - The budget ran out; overshoot is
    ///   bounded by one retry interval
    /// * `Err(SemaphoreError::Cancelled)` - `cancel` fired
    /// * Any other error from an attempt, returned immediately
    pub fn acquire_with(
        &self,
        record: LockRecord,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<LockGuard> {
        let deadline = deadline_after(timeout);

        loop {
            if cancel.is_cancelled() {
                return Err(SemaphoreError::Cancelled);
            }

            let attempt = LockRecord {
                acquired_at: unix_now(),
                ..record.clone()
            };
            match self.try_acquire_with(attempt) {
                Ok(guard) => return Ok(guard),
                Err(SemaphoreError::AlreadyLocked { holder_id, .. }) => {
                    debug!(path = %self.path.display(), ?holder_id, "lock busy, waiting");
                }
                Err(e) => return Err(e),
            }

            self.pause(deadline, cancel)?;
        }
    }

    /// Block until the lock is free or stale, without acquiring it.
    ///
    /// Returns the status observed when the wait ended.
    pub fn wait_until_free(
        &self,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<LockStatus> {
        let deadline = deadline_after(timeout);

        loop {
            if cancel.is_cancelled() {
                return Err(SemaphoreError::Cancelled);
            }

            let status = self.status()?;
            if !status.locked || status.stale {
                return Ok(status);
            }

            self.pause(deadline, cancel)?;
        }
    }

    /// Remove the lock file regardless of who holds it.
    ///
    /// **Use with caution!** The current holder still believes it owns the
    /// resource, so this breaks mutual exclusion unless the holder is known
    /// to be gone. Returns `Ok(false)` if there was no lock file.
    pub fn force_release(&self) -> Result<bool> {
        let removed = remove_if_exists(&self.path).map_err(|e| SemaphoreError::io(&self.path, e))?;
        if removed {
            info!(path = %self.path.display(), "lock force-released");
        }
        Ok(removed)
    }

    /// Read-only snapshot of the lock file. Never mutates, never blocks.
    pub fn status(&self) -> Result<LockStatus> {
        let mut status = LockStatus::free(self.path.clone());

        match self.read_existing()? {
            Existing::Missing => {}
            Existing::Unparseable => {
                status.locked = true;
                status.unparseable = true;
            }
            Existing::Record { record, .. } => {
                let now = unix_now();
                status.locked = true;
                status.pid = Some(record.holder_id);
                status.timestamp = Some(record.acquired_at);
                status.age_seconds = Some(record.age(now).as_secs());
                status.holder_alive = self.probe.is_alive(record.holder_id);
                status.stale =
                    stale_reason(&record, now, self.config.stale_timeout, &*self.probe).is_some();
                status.tag = record.tag;
            }
        }

        Ok(status)
    }

    fn create(&self, contents: &str) -> Result<CreateOutcome> {
        create_exclusive(&self.path, contents.as_bytes())
            .map_err(|e| SemaphoreError::io(&self.path, e))
    }

    fn acquired(&self, record: LockRecord, contents: String) -> LockGuard {
        info!(path = %self.path.display(), holder = record.holder_id, "lock acquired");
        LockGuard::new(self.path.clone(), record, contents)
    }

    fn read_existing(&self) -> Result<Existing> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Existing::Missing),
            Err(e) => return Err(SemaphoreError::io(&self.path, e)),
        };

        let parsed = std::str::from_utf8(&raw)
            .ok()
            .and_then(|text| LockRecord::parse(text).ok());

        Ok(match parsed {
            Some(record) => Existing::Record { record, raw },
            None => Existing::Unparseable,
        })
    }

    /// Sleep one retry interval, clipped to the deadline.
    fn pause(&self, deadline: Option<Instant>, cancel: &CancelToken) -> Result<()> {
        let nap = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(SemaphoreError::Timeout);
                }
                self.config.retry_interval.min(deadline - now)
            }
            None => self.config.retry_interval,
        };

        thread::sleep(nap);

        if cancel.is_cancelled() {
            return Err(SemaphoreError::Cancelled);
        }
        Ok(())
    }
}

/// Record text plus a `nonce` line unique to this acquisition.
///
/// Readers ignore the extra key. The guard compares whole file contents at
/// release, so the nonce keeps two claims with the same pid, second and tag
/// from looking identical.
fn claim_contents(record: &LockRecord) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    let counter = CLAIM_COUNTER.fetch_add(1, Ordering::Relaxed);

    format!(
        "{}nonce={:x}-{:x}-{:x}\n",
        record.serialize(),
        std::process::id(),
        nanos,
        counter
    )
}

fn already_locked(record: &LockRecord) -> SemaphoreError {
    SemaphoreError::AlreadyLocked {
        holder_id: Some(record.holder_id),
        locked_since: Some(record.acquired_at),
    }
}

/// Deadline `timeout` from now. A timeout too large to represent waits forever.
fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(SemaphoreError::InvalidPath("path cannot be empty".to_string()));
    }

    // `file_name` ignores a trailing separator, but the OS will not
    if path
        .as_os_str()
        .to_string_lossy()
        .chars()
        .last()
        .is_some_and(std::path::is_separator)
    {
        return Err(SemaphoreError::InvalidPath(format!(
            "path ends with a separator: {}",
            path.display()
        )));
    }

    if path.file_name().is_none() {
        return Err(SemaphoreError::InvalidPath(format!(
            "path has no file name: {}",
            path.display()
        )));
    }

    if path.is_dir() {
        return Err(SemaphoreError::InvalidPath(format!(
            "path is a directory: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.is_dir()
    {
        return Err(SemaphoreError::InvalidPath(format!(
            "parent directory does not exist: {}",
            parent.display()
        )));
    }

    Ok(())
}
