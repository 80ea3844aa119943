//! CLI argument parsing for filesem.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// filesem: cross-process file-based semaphore.
///
/// A lock is a small text file (`pid=`, `timestamp=`, optional `tag=`).
/// Any process that can create files exclusively can take part, whatever
/// language it is written in.
///
/// Exit codes: 0 success, 1 lock held or timed out, 2 usage error, 3 I/O error.
#[derive(Parser, Debug)]
#[command(name = "filesem")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Options accepted before or after any subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Seconds after which a lock is stale (0 disables age-based staleness).
    #[arg(long, global = true, value_name = "SECONDS")]
    pub stale: Option<u64>,

    /// Tag to record in the lock file.
    #[arg(long, global = true, value_name = "STRING")]
    pub tag: Option<String>,

    /// Holder pid to record (defaults to the invoking process).
    #[arg(long, global = true, value_name = "PID", value_parser = clap::value_parser!(u32).range(1..))]
    pub pid: Option<u32>,

    /// Milliseconds between attempts while waiting.
    #[arg(long = "retry-ms", global = true, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub retry_ms: Option<u64>,

    /// Emit machine-readable JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// YAML file with default settings.
    #[arg(long, global = true, env = "FILESEM_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append an NDJSON audit event per command to this file.
    #[arg(long = "events-log", global = true, env = "FILESEM_EVENTS_LOG", value_name = "PATH")]
    pub events_log: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands for filesem.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Try to acquire a lock without blocking.
    ///
    /// Exits 0 if acquired, 1 if already held.
    Try(LockArgs),

    /// Acquire a lock, polling until it is available or the timeout elapses.
    ///
    /// Exits 0 if acquired, 1 on timeout.
    Acquire(TimedArgs),

    /// Remove a lock file unconditionally.
    ///
    /// This breaks mutual exclusion if the holder is still working; intended
    /// for the holder itself or for operator recovery.
    Release(LockArgs),

    /// Show lock status and holder information.
    ///
    /// Always exits 0 unless the lock file cannot be read.
    Status(LockArgs),

    /// Wait until a lock is free (or stale) without acquiring it.
    ///
    /// Exits 0 when free, 1 on timeout.
    Wait(TimedArgs),
}

/// Arguments for commands that take only a lock path.
#[derive(Args, Debug)]
pub struct LockArgs {
    /// Path to the lock file.
    pub path: PathBuf,
}

/// Arguments for blocking commands.
#[derive(Args, Debug)]
pub struct TimedArgs {
    /// Path to the lock file.
    pub path: PathBuf,

    /// Give up after this many seconds (fractions allowed; default waits forever).
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub timeout: Option<Duration>,
}

/// Parse a non-negative, possibly fractional number of seconds.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("invalid number of seconds: '{}'", value))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("invalid number of seconds: '{}'", value))
}
