//! Settings struct definition and default implementation.

use crate::locks::{DEFAULT_RETRY_INTERVAL, DEFAULT_STALE_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI defaults loaded from a YAML file.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Seconds after which a lock is considered stale (0 disables).
    #[serde(default = "default_stale_seconds")]
    pub stale_seconds: u64,

    /// Milliseconds between attempts for `acquire` and `wait`.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Default wait budget for `acquire` and `wait` (unset waits forever).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquire_timeout_seconds: Option<u64>,

    /// Tag written into lock records when `--tag` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    // =========================================================================
    // Audit settings
    // =========================================================================
    /// NDJSON file receiving one event per command outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stale_seconds: default_stale_seconds(),
            retry_interval_ms: default_retry_interval_ms(),
            acquire_timeout_seconds: None,
            tag: None,
            events_log: None,
        }
    }
}

fn default_stale_seconds() -> u64 {
    DEFAULT_STALE_TIMEOUT.as_secs()
}

fn default_retry_interval_ms() -> u64 {
    DEFAULT_RETRY_INTERVAL.as_millis() as u64
}
