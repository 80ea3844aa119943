//! Implementation of the `wait` command.

use super::Session;
use filesem::events::EventAction;
use filesem::{CancelToken, Result};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

/// Execute `filesem wait <path> [--timeout SECONDS]`.
///
/// Blocks until the lock file is gone or stale. Never acquires.
pub fn cmd_wait(session: &Session, path: &Path, timeout: Option<Duration>) -> Result<()> {
    let sem = session.semaphore(path)?;

    let status = sem
        .wait_until_free(session.timeout(timeout), &CancelToken::new())
        .inspect_err(|e| session.log_failure(path, e))?;

    session.log_event(
        EventAction::Wait,
        path,
        json!({"stale": status.stale, "pid": status.pid}),
    );

    if status.stale {
        session.say(format!("Lock is stale: {}", path.display()));
    } else {
        session.say(format!("Lock is free: {}", path.display()));
    }
    session.emit(&json!({
        "ok": true,
        "free": true,
        "stale": status.stale,
        "path": path,
        "pid": status.pid,
    }));

    Ok(())
}
