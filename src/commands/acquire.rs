//! Implementation of the `try` and `acquire` commands.
//!
//! Both leave the lock file in place when the CLI exits: the guard is
//! detached and the lock belongs to the invoking process until something
//! runs `release` (or the record goes stale).

use super::Session;
use filesem::events::EventAction;
use filesem::{CancelToken, LockGuard, LockRecord, Result};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

/// Execute `filesem try <path>`.
pub fn cmd_try(session: &Session, path: &Path) -> Result<()> {
    let sem = session.semaphore(path)?;

    let guard = sem
        .try_acquire_with(session.holder_record())
        .inspect_err(|e| session.log_failure(path, e))?;

    finish(session, path, guard);
    Ok(())
}

/// Execute `filesem acquire <path> [--timeout SECONDS]`.
pub fn cmd_acquire(session: &Session, path: &Path, timeout: Option<Duration>) -> Result<()> {
    let sem = session.semaphore(path)?;

    let guard = sem
        .acquire_with(
            session.holder_record(),
            session.timeout(timeout),
            &CancelToken::new(),
        )
        .inspect_err(|e| session.log_failure(path, e))?;

    finish(session, path, guard);
    Ok(())
}

fn finish(session: &Session, path: &Path, guard: LockGuard) {
    let record: LockRecord = guard.detach();

    session.log_event(
        EventAction::Acquire,
        path,
        json!({"pid": record.holder_id, "timestamp": record.acquired_at, "tag": record.tag}),
    );

    session.say(format!("Lock acquired: {}", path.display()));
    session.emit(&json!({
        "ok": true,
        "acquired": true,
        "path": path,
        "pid": record.holder_id,
        "timestamp": record.acquired_at,
        "tag": record.tag,
    }));
}
