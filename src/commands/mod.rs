//! Command implementations for filesem.
//!
//! Each subcommand is a thin wrapper around the [`Semaphore`] façade. The
//! [`Session`] merges command-line flags over the config file and owns the
//! output mode (`--json`, `--quiet`) and the optional audit log.
//!
//! Expected failures (`AlreadyLocked`, `Timeout`) are returned as errors and
//! mapped to exit codes by `main`, exactly like I/O failures.

mod acquire;
mod release;
mod status;
mod wait;

use crate::cli::{Command, GlobalArgs};
use filesem::config::Settings;
use filesem::events::{Event, EventAction, append_event};
use filesem::{LockRecord, Result, Semaphore, SemaphoreConfig, SemaphoreError};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, session: &Session) -> Result<()> {
    match command {
        Command::Try(args) => acquire::cmd_try(session, &args.path),
        Command::Acquire(args) => acquire::cmd_acquire(session, &args.path, args.timeout),
        Command::Release(args) => release::cmd_release(session, &args.path),
        Command::Status(args) => status::cmd_status(session, &args.path),
        Command::Wait(args) => wait::cmd_wait(session, &args.path, args.timeout),
    }
}

/// Effective settings for one invocation.
#[derive(Debug, Clone)]
pub struct Session {
    settings: Settings,
    global: GlobalArgs,
}

impl Session {
    pub fn new(settings: Settings, global: GlobalArgs) -> Self {
        Self { settings, global }
    }

    /// Library configuration with command-line overrides applied.
    pub fn semaphore_config(&self) -> SemaphoreConfig {
        let mut config = self.settings.semaphore_config();
        if let Some(stale) = self.global.stale {
            config.stale_timeout = (stale > 0).then(|| Duration::from_secs(stale));
        }
        if let Some(ms) = self.global.retry_ms {
            config.retry_interval = Duration::from_millis(ms);
        }
        config
    }

    fn semaphore(&self, path: &Path) -> Result<Semaphore> {
        Semaphore::new(path, self.semaphore_config())
    }

    /// Record written by `try`/`acquire`.
    fn holder_record(&self) -> LockRecord {
        let tag = self.global.tag.clone().or_else(|| self.settings.tag.clone());
        LockRecord::for_holder(self.global.pid.unwrap_or_else(invoking_pid), tag)
    }

    /// `--timeout` if given, otherwise the configured default.
    fn timeout(&self, arg: Option<Duration>) -> Option<Duration> {
        arg.or_else(|| self.settings.acquire_timeout_seconds.map(Duration::from_secs))
    }

    fn events_log(&self) -> Option<&PathBuf> {
        self.global
            .events_log
            .as_ref()
            .or(self.settings.events_log.as_ref())
    }

    pub fn json(&self) -> bool {
        self.global.json
    }

    pub fn quiet(&self) -> bool {
        self.global.quiet
    }

    /// Print a human-readable line on stdout unless quiet or in JSON mode.
    fn say(&self, message: impl AsRef<str>) {
        if !self.global.quiet && !self.global.json {
            println!("{}", message.as_ref());
        }
    }

    /// Print a JSON document on stdout when in JSON mode.
    fn emit(&self, value: &Value) {
        if self.global.json {
            println!("{}", value);
        }
    }

    /// Append an audit event if a log is configured.
    ///
    /// Audit failures never change a command's outcome.
    fn log_event(&self, action: EventAction, path: &Path, details: Value) {
        let Some(log) = self.events_log() else {
            return;
        };
        let event = Event::new(action, path).with_details(details);
        if let Err(e) = append_event(log, &event) {
            warn!(log = %log.display(), error = %format!("{:#}", e), "failed to append audit event");
        }
    }

    /// Log contention or timeout outcomes before they propagate.
    fn log_failure(&self, path: &Path, err: &SemaphoreError) {
        match err {
            SemaphoreError::AlreadyLocked {
                holder_id,
                locked_since,
            } => self.log_event(
                EventAction::Contended,
                path,
                json!({"holder_pid": holder_id, "locked_since": locked_since}),
            ),
            SemaphoreError::Timeout => self.log_event(EventAction::Timeout, path, json!({})),
            _ => {}
        }
    }
}

/// Print an error the way the selected output mode expects.
///
/// Contention and timeouts are routine, so `--quiet` silences them; anything
/// else is always reported.
pub fn report_error(global: &GlobalArgs, err: &SemaphoreError) {
    let routine = matches!(
        err,
        SemaphoreError::AlreadyLocked { .. } | SemaphoreError::Timeout | SemaphoreError::Cancelled
    );

    if global.json {
        println!("{}", error_json(err));
        return;
    }
    if routine && global.quiet {
        return;
    }
    eprintln!("Error: {}", err);
}

fn error_json(err: &SemaphoreError) -> Value {
    let kind = match err {
        SemaphoreError::AlreadyLocked { .. } => "already_locked",
        SemaphoreError::Timeout => "timeout",
        SemaphoreError::Cancelled => "cancelled",
        SemaphoreError::InvalidPath(_) => "invalid_path",
        SemaphoreError::Io { .. } => "io_error",
        SemaphoreError::ParseError(_) => "parse_error",
        SemaphoreError::NotLocked => "not_locked",
    };

    let mut value = json!({
        "ok": false,
        "error": kind,
        "message": err.to_string(),
    });
    if let SemaphoreError::AlreadyLocked {
        holder_id,
        locked_since,
    } = err
    {
        value["holder_pid"] = json!(holder_id);
        value["locked_since"] = json!(locked_since);
    }
    value
}

/// The process the CLI acts on behalf of.
///
/// The CLI exits right after acquiring, so recording its own pid would make
/// every lock look abandoned to the liveness probe. The parent (the shell or
/// tool that invoked us) is the real holder.
#[cfg(unix)]
fn invoking_pid() -> u32 {
    let ppid = unsafe { libc::getppid() };
    u32::try_from(ppid).unwrap_or_else(|_| std::process::id())
}

#[cfg(not(unix))]
fn invoking_pid() -> u32 {
    std::process::id()
}
