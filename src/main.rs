//! Courtfile: multi-tribunal e-filing orchestrator.
//!
//! This is the main entry point for the `courtfile` CLI. It parses arguments,
//! sets up logging, loads the configuration once, dispatches to the
//! appropriate command handler, and handles errors with proper exit codes.

mod cli;
mod commands;
pub mod agent;
pub mod batch;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod extract;
pub mod flow;
pub mod fs;
pub mod notify;
pub mod retry;
pub mod session;
pub mod submission;

#[cfg(test)]
mod test_support;

use cli::Cli;
use context::DataContext;
use error::Result;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = DataContext::resolve(cli.data_dir.as_deref())?;
    let mut config = ctx.load_config()?;
    config.apply_env_overrides(std::env::vars());
    config.validate()?;

    commands::dispatch(cli.command, &ctx, &config)
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
