//! Implementation of the `status` command.
//!
//! A query, not a test: the exit code is 0 whether the lock is held or free.

use super::Session;
use filesem::{LockStatus, Result};
use std::path::Path;

/// Execute `filesem status <path>`.
pub fn cmd_status(session: &Session, path: &Path) -> Result<()> {
    let status = session.semaphore(path)?.status()?;

    if session.json() {
        session.emit(&serde_json::to_value(&status).unwrap_or_default());
    } else if !session.quiet() {
        print_status(&status);
    }

    Ok(())
}

fn print_status(status: &LockStatus) {
    if !status.locked {
        println!("Lock status: FREE");
        println!("  Path:      {}", status.path.display());
        return;
    }

    println!("Lock status: LOCKED{}", if status.stale { " (STALE)" } else { "" });
    println!("  Path:      {}", status.path.display());

    if status.unparseable {
        println!("  Holder:    unknown (lock file is not a valid record)");
        return;
    }

    if let Some(pid) = status.pid {
        println!("  PID:       {}", pid);
    }
    if let Some(ts) = status.timestamp {
        let when = i64::try_from(ts)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| ts.to_string());
        println!("  Acquired:  {} ({} ago)", when, status.age_string().unwrap_or_default());
    }
    if let Some(tag) = &status.tag {
        println!("  Tag:       {}", tag);
    }
    println!(
        "  Running:   {}",
        match status.holder_alive {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unknown",
        }
    );
}
