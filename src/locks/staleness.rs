//! Staleness evaluation for existing lock records.
//!
//! A record is stale when it is older than the configured timeout, or when a
//! liveness probe reports that the holder process no longer exists. The probe
//! lets a crashed holder be recovered immediately instead of after the full
//! timeout.
//!
//! Process ids are recycled by the OS. If a holder dies and an unrelated
//! process receives the same pid, the probe reports "alive" and only the age
//! threshold will reclaim the lock.

use super::record::LockRecord;
use std::fmt;
use std::time::Duration;

/// Answers whether a process id currently refers to a running process.
pub trait LivenessProbe: fmt::Debug + Send + Sync {
    /// `Some(true)` alive, `Some(false)` gone, `None` cannot tell.
    fn is_alive(&self, pid: u32) -> Option<bool>;
}

/// Probe backed by the operating system.
///
/// On Unix this is `kill(pid, 0)`, which checks for existence without
/// delivering a signal. Other platforms cannot tell and fall back to
/// age-based staleness.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl LivenessProbe for SystemProbe {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> Option<bool> {
        // pid 0 and negative values address process groups, never probe them
        let pid = match libc::pid_t::try_from(pid) {
            Ok(pid) if pid > 0 => pid,
            _ => return Some(false),
        };

        if unsafe { libc::kill(pid, 0) } == 0 {
            return Some(true);
        }

        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::ESRCH) => Some(false),
            // EPERM: the process exists but belongs to someone else
            Some(libc::EPERM) => Some(true),
            _ => None,
        }
    }

    #[cfg(not(unix))]
    fn is_alive(&self, _pid: u32) -> Option<bool> {
        None
    }
}

/// Probe that never knows; staleness is decided by age alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl LivenessProbe for NoProbe {
    fn is_alive(&self, _pid: u32) -> Option<bool> {
        None
    }
}

/// Why a record was judged stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// Older than the stale timeout.
    Expired,
    /// The holder process no longer exists.
    HolderGone,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::Expired => write!(f, "expired"),
            StaleReason::HolderGone => write!(f, "holder gone"),
        }
    }
}

/// Decide whether `record` is stale at `now` (Unix seconds).
pub fn is_stale(
    record: &LockRecord,
    now: u64,
    stale_timeout: Option<Duration>,
    probe: &dyn LivenessProbe,
) -> bool {
    stale_reason(record, now, stale_timeout, probe).is_some()
}

/// Like [`is_stale`], reporting which criterion fired.
///
/// Age is checked first: once the timeout has elapsed the record is stale
/// even if the holder pid is alive.
pub fn stale_reason(
    record: &LockRecord,
    now: u64,
    stale_timeout: Option<Duration>,
    probe: &dyn LivenessProbe,
) -> Option<StaleReason> {
    if let Some(timeout) = stale_timeout
        && record.age(now).as_secs() > timeout.as_secs()
    {
        return Some(StaleReason::Expired);
    }

    match probe.is_alive(record.holder_id) {
        Some(false) => Some(StaleReason::HolderGone),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedProbe(Option<bool>);

    impl LivenessProbe for FixedProbe {
        fn is_alive(&self, _pid: u32) -> Option<bool> {
            self.0
        }
    }

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn fresh_record_with_live_holder_is_not_stale() {
        let record = LockRecord::new(1, NOW - 10, None);
        assert!(!is_stale(&record, NOW, Some(Duration::from_secs(60)), &FixedProbe(Some(true))));
    }

    #[test]
    fn expired_record_is_stale_even_with_live_holder() {
        let record = LockRecord::new(1, NOW - 120, None);
        let reason = stale_reason(&record, NOW, Some(Duration::from_secs(60)), &FixedProbe(Some(true)));
        assert_eq!(reason, Some(StaleReason::Expired));
    }

    #[test]
    fn age_threshold_is_strict() {
        let record = LockRecord::new(1, NOW - 60, None);
        assert!(!is_stale(&record, NOW, Some(Duration::from_secs(60)), &NoProbe));

        let record = LockRecord::new(1, NOW - 61, None);
        assert!(is_stale(&record, NOW, Some(Duration::from_secs(60)), &NoProbe));
    }

    #[test]
    fn no_timeout_never_expires_by_age() {
        let record = LockRecord::new(1, 0, None);
        assert!(!is_stale(&record, NOW, None, &NoProbe));
    }

    #[test]
    fn dead_holder_is_stale_regardless_of_age() {
        let record = LockRecord::new(1, NOW, None);
        let reason = stale_reason(&record, NOW, None, &FixedProbe(Some(false)));
        assert_eq!(reason, Some(StaleReason::HolderGone));
    }

    #[test]
    fn unknown_liveness_falls_back_to_age() {
        let record = LockRecord::new(1, NOW, None);
        assert!(!is_stale(&record, NOW, Some(Duration::from_secs(60)), &FixedProbe(None)));
    }

    #[test]
    fn future_timestamp_is_not_expired() {
        let record = LockRecord::new(1, NOW + 3600, None);
        assert!(!is_stale(&record, NOW, Some(Duration::from_secs(1)), &NoProbe));
    }

    #[cfg(unix)]
    #[test]
    fn system_probe_sees_current_process() {
        assert_eq!(SystemProbe.is_alive(std::process::id()), Some(true));
    }

    #[cfg(unix)]
    #[test]
    fn system_probe_reports_missing_process() {
        assert_eq!(SystemProbe.is_alive(999_999_999), Some(false));
    }

    #[cfg(unix)]
    #[test]
    fn system_probe_never_signals_process_groups() {
        assert_eq!(SystemProbe.is_alive(0), Some(false));
        assert_eq!(SystemProbe.is_alive(u32::MAX), Some(false));
    }
}
