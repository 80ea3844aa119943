//! filesem: cross-process file-based semaphore.
//!
//! This is the main entry point for the `filesem` CLI. It parses arguments,
//! sets up logging, loads the optional config file, dispatches to the
//! appropriate command handler, and maps errors to exit codes.

mod cli;
mod commands;

use cli::Cli;
use commands::Session;
use filesem::config::Settings;
use filesem::exit_codes;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.global.verbose);

    let settings = match cli.global.config.as_ref() {
        Some(path) => match Settings::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("Error: {:#}", err);
                return ExitCode::from(exit_codes::USAGE_ERROR as u8);
            }
        },
        None => Settings::default(),
    };

    let global = cli.global.clone();
    let session = Session::new(settings, cli.global);

    match commands::dispatch(cli.command, &session) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            commands::report_error(&global, &err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Diagnostics go to stderr so stdout stays clean for `--json`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
