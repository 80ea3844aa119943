//! Audit event log for filesem.
//!
//! When enabled (`--events-log` or `events_log` in the config file), every
//! CLI command appends one event describing its outcome. Events are stored in
//! NDJSON format (one JSON object per line) so several processes can append
//! to the same file.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (acquire, contended, timeout, release, ...)
//! - `actor`: the owner string (e.g., `user@HOST`)
//! - `path`: the lock file path
//! - `details`: freeform object with action-specific details
//!
//! ```no_run
//! use filesem::events::{Event, EventAction, append_event};
//! use serde_json::json;
//!
//! let event = Event::new(EventAction::Acquire, "/tmp/nightly.lock")
//!     .with_details(json!({"pid": 4242}));
//! append_event("/var/log/filesem.ndjson", &event)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Lock acquired (`try` or `acquire`)
    Acquire,
    /// Acquisition refused because another holder owns the lock
    Contended,
    /// A blocking command ran out of time
    Timeout,
    /// Lock file removed by `release`
    Release,
    /// `wait` observed the lock free
    Wait,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Acquire => write!(f, "acquire"),
            EventAction::Contended => write!(f, "contended"),
            EventAction::Timeout => write!(f, "timeout"),
            EventAction::Release => write!(f, "release"),
            EventAction::Wait => write!(f, "wait"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// The lock file the action concerned.
    pub path: PathBuf,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event for `path` stamped with the current time and actor.
    pub fn new(action: EventAction, path: impl Into<PathBuf>) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            path: path.into(),
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize event to JSON")
    }
}

/// Get the actor string for event metadata.
pub(crate) fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the NDJSON log at `log_path`.
///
/// The file (and its parent directory) is created if missing. Each event is
/// written with a single `write` call in append mode so concurrent writers
/// do not interleave within a line.
pub fn append_event<P: AsRef<Path>>(log_path: P, event: &Event) -> Result<()> {
    let log_path = log_path.as_ref();
    let mut line = event.to_ndjson_line()?;
    line.push('\n');

    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create events directory '{}'", parent.display())
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open events file '{}'", log_path.display()))?;

    file.write_all(line.as_bytes())
        .with_context(|| format!("failed to write event to '{}'", log_path.display()))?;

    file.sync_all()
        .with_context(|| format!("failed to sync events file '{}'", log_path.display()))?;

    Ok(())
}

/// Read all events from the log, skipping lines that do not parse.
pub fn read_events<P: AsRef<Path>>(log_path: P) -> Result<Vec<Event>> {
    let log_path = log_path.as_ref();
    let content = fs::read_to_string(log_path)
        .with_context(|| format!("failed to read events file '{}'", log_path.display()))?;

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::Acquire, "/tmp/a.lock");

        assert_eq!(event.action, EventAction::Acquire);
        assert!(event.actor.contains('@'));
        assert_eq!(event.path, PathBuf::from("/tmp/a.lock"));
        assert!(event.details.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_event_serializes_to_single_line() {
        let event = Event::new(EventAction::Contended, "/tmp/a.lock")
            .with_details(json!({"holder_pid": 42, "note": "multi\nline"}));
        let line = event.to_ndjson_line().unwrap();

        assert!(!line.contains('\n'));
        assert!(line.contains("\"action\":\"contended\""));
        assert!(line.contains("\"holder_pid\":42"));
    }

    #[test]
    fn test_append_creates_file_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("audit").join("events.ndjson");

        append_event(&log, &Event::new(EventAction::Acquire, "/tmp/a.lock")).unwrap();
        append_event(&log, &Event::new(EventAction::Release, "/tmp/a.lock")).unwrap();

        let events = read_events(&log).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::Acquire);
        assert_eq!(events[1].action, EventAction::Release);
    }

    #[test]
    fn test_read_events_skips_garbage_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("events.ndjson");

        append_event(&log, &Event::new(EventAction::Wait, "/tmp/a.lock")).unwrap();
        let mut file = OpenOptions::new().append(true).open(&log).unwrap();
        writeln!(file, "not json").unwrap();

        let events = read_events(&log).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, EventAction::Wait);
    }

    #[test]
    fn test_action_display_matches_serde() {
        for action in [
            EventAction::Acquire,
            EventAction::Contended,
            EventAction::Timeout,
            EventAction::Release,
            EventAction::Wait,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action));
        }
    }
}
