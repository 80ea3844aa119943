//! Implementation of the `release` command.

use super::Session;
use filesem::Result;
use filesem::events::EventAction;
use serde_json::json;
use std::path::Path;

/// Execute `filesem release <path>`.
///
/// Removes the lock file whoever holds it. A missing lock file is not an
/// error: the goal state (no lock) already holds.
pub fn cmd_release(session: &Session, path: &Path) -> Result<()> {
    let sem = session.semaphore(path)?;

    // Informational only; the holder can change before the removal below
    let previous = sem.status().ok().and_then(|s| s.pid);
    let removed = sem.force_release()?;

    session.log_event(
        EventAction::Release,
        path,
        json!({"existed": removed, "previous_pid": previous}),
    );

    if removed {
        session.say(format!("Lock released: {}", path.display()));
    } else {
        session.say(format!("No lock to release: {}", path.display()));
    }
    session.emit(&json!({
        "ok": true,
        "released": removed,
        "path": path,
        "previous_pid": previous,
    }));

    Ok(())
}
