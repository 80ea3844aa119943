//! Lock record codec.
//!
//! The record is line-oriented `key=value` text so that tools written in any
//! language can read and write it:
//!
//! ```text
//! pid=4242
//! timestamp=1700000000
//! tag=nightly-backup
//! ```
//!
//! `pid` and `timestamp` are required. Key order does not matter, blank lines
//! and unknown keys are ignored, and the last occurrence of a repeated key
//! wins.

use crate::error::{Result, SemaphoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The on-disk claim on a named resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Process id of the holder.
    #[serde(rename = "pid")]
    pub holder_id: u32,

    /// Unix timestamp (seconds) when the lock was created.
    #[serde(rename = "timestamp")]
    pub acquired_at: u64,

    /// Optional human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl LockRecord {
    pub fn new(holder_id: u32, acquired_at: u64, tag: Option<String>) -> Self {
        Self {
            holder_id,
            acquired_at,
            tag,
        }
    }

    /// A record for the current process, stamped with the current time.
    pub fn for_current_process(tag: Option<String>) -> Self {
        Self::for_holder(std::process::id(), tag)
    }

    /// A record for an explicit holder pid, stamped with the current time.
    pub fn for_holder(holder_id: u32, tag: Option<String>) -> Self {
        Self::new(holder_id, unix_now(), tag)
    }

    /// Serialize to the lock file text format.
    ///
    /// Line breaks inside the tag are replaced with spaces so a tag can never
    /// inject extra keys.
    pub fn serialize(&self) -> String {
        let mut content = format!("pid={}\ntimestamp={}\n", self.holder_id, self.acquired_at);
        if let Some(tag) = &self.tag {
            let sanitized = tag.replace(['\r', '\n'], " ");
            content.push_str(&format!("tag={}\n", sanitized));
        }
        content
    }

    /// Parse a record from lock file contents.
    ///
    /// Fails with `ParseError` when `pid` or `timestamp` is missing or not a
    /// number. Partially written or foreign files end up here, never in a
    /// panic.
    pub fn parse(content: &str) -> Result<Self> {
        let mut pid = None;
        let mut timestamp = None;
        let mut tag = None;

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            match key.trim() {
                "pid" => pid = Some(parse_number::<u32>("pid", value)?),
                "timestamp" => timestamp = Some(parse_number::<u64>("timestamp", value)?),
                "tag" => tag = Some(value.to_string()),
                _ => {}
            }
        }

        let holder_id = pid.ok_or_else(|| SemaphoreError::ParseError("missing pid".to_string()))?;
        let acquired_at = timestamp
            .ok_or_else(|| SemaphoreError::ParseError("missing timestamp".to_string()))?;

        Ok(Self {
            holder_id,
            acquired_at,
            tag,
        })
    }

    /// Elapsed time since acquisition, saturating at zero for clock skew.
    pub fn age(&self, now: u64) -> Duration {
        Duration::from_secs(now.saturating_sub(self.acquired_at))
    }

    /// Acquisition time as a UTC datetime, if representable.
    pub fn acquired_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.acquired_at).ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

impl fmt::Display for LockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {} since {}", self.holder_id, self.acquired_at)?;
        if let Some(tag) = &self.tag {
            write!(f, " ({})", tag)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        SemaphoreError::ParseError(format!("invalid {} value '{}'", key, value.trim()))
    })
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Format a duration as a short human-readable age.
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    let minutes = secs / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_writes_required_keys() {
        let record = LockRecord::new(4242, 1_700_000_000, None);
        assert_eq!(record.serialize(), "pid=4242\ntimestamp=1700000000\n");
    }

    #[test]
    fn serialize_includes_tag() {
        let record = LockRecord::new(1, 2, Some("nightly-backup".to_string()));
        assert_eq!(record.serialize(), "pid=1\ntimestamp=2\ntag=nightly-backup\n");
    }

    #[test]
    fn serialize_sanitizes_line_breaks_in_tag() {
        let record = LockRecord::new(1, 2, Some("a\npid=99\r\nb".to_string()));
        let text = record.serialize();

        assert_eq!(text.lines().count(), 3);
        let parsed = LockRecord::parse(&text).unwrap();
        assert_eq!(parsed.holder_id, 1);
        assert_eq!(parsed.tag.as_deref(), Some("a pid=99  b"));
    }

    #[test]
    fn round_trip_preserves_records() {
        let records = [
            LockRecord::new(0, 0, None),
            LockRecord::new(u32::MAX, u64::MAX, None),
            LockRecord::new(77, 1_700_000_000, Some(String::new())),
            LockRecord::new(77, 1_700_000_000, Some("  padded tag  ".to_string())),
            LockRecord::new(77, 1_700_000_000, Some("k=v=w".to_string())),
            LockRecord::new(77, 1_700_000_000, Some("ünïcödé ✓".to_string())),
        ];

        for record in records {
            assert_eq!(LockRecord::parse(&record.serialize()).unwrap(), record);
        }
    }

    #[test]
    fn parse_ignores_order_blank_lines_and_unknown_keys() {
        let text = "\nhost=build-01\ntag=ci\n\ntimestamp=10\nversion=2\npid=5\n";
        let record = LockRecord::parse(text).unwrap();

        assert_eq!(record, LockRecord::new(5, 10, Some("ci".to_string())));
    }

    #[test]
    fn parse_accepts_crlf_and_padding() {
        let record = LockRecord::parse("pid= 12 \r\ntimestamp=34\r\n").unwrap();
        assert_eq!(record, LockRecord::new(12, 34, None));
    }

    #[test]
    fn parse_last_duplicate_wins() {
        let record = LockRecord::parse("pid=1\npid=2\ntimestamp=3\n").unwrap();
        assert_eq!(record.holder_id, 2);
    }

    #[test]
    fn parse_missing_pid_fails() {
        let err = LockRecord::parse("timestamp=10\n").unwrap_err();
        assert!(matches!(err, SemaphoreError::ParseError(msg) if msg.contains("pid")));
    }

    #[test]
    fn parse_missing_timestamp_fails() {
        let err = LockRecord::parse("pid=10\n").unwrap_err();
        assert!(matches!(err, SemaphoreError::ParseError(msg) if msg.contains("timestamp")));
    }

    #[test]
    fn parse_non_numeric_values_fail() {
        assert!(LockRecord::parse("pid=abc\ntimestamp=1\n").is_err());
        assert!(LockRecord::parse("pid=1\ntimestamp=-5\n").is_err());
        assert!(LockRecord::parse("pid=99999999999\ntimestamp=1\n").is_err());
    }

    #[test]
    fn parse_garbage_never_panics() {
        let inputs = ["", "\n\n", "pid", "=", "pid=", "\u{0}\u{1}", "pid=1\ntimest", "{\"pid\":1}"];
        for input in inputs {
            assert!(LockRecord::parse(input).is_err(), "expected error for {:?}", input);
        }
    }

    #[test]
    fn age_saturates_for_future_timestamps() {
        let record = LockRecord::new(1, 1_000, None);
        assert_eq!(record.age(1_060), Duration::from_secs(60));
        assert_eq!(record.age(500), Duration::ZERO);
    }

    #[test]
    fn for_current_process_stamps_pid_and_time() {
        let before = unix_now();
        let record = LockRecord::for_current_process(Some("t".to_string()));

        assert_eq!(record.holder_id, std::process::id());
        assert!(record.acquired_at >= before);
        assert!(record.acquired_at <= unix_now());
    }

    #[test]
    fn acquired_at_utc_converts() {
        let record = LockRecord::new(1, 0, None);
        assert_eq!(record.acquired_at_utc().unwrap().timestamp(), 0);
        assert!(LockRecord::new(1, u64::MAX, None).acquired_at_utc().is_none());
    }

    #[test]
    fn format_age_units() {
        assert_eq!(format_age(Duration::from_secs(42)), "42s");
        assert_eq!(format_age(Duration::from_secs(5 * 60 + 3)), "5m");
        assert_eq!(format_age(Duration::from_secs(2 * 3600 + 3 * 60)), "2h 3m");
        assert_eq!(format_age(Duration::from_secs(28 * 3600)), "1d 4h");
    }
}
