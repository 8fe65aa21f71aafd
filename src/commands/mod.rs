//! Command implementations for courtfile.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, and wires the concrete collaborators (subprocess gateway,
//! file credential store, configured sessions, NDJSON audit log) into the
//! orchestrator for the commands that submit filings.

mod credentials;
mod events;
mod flow;
mod submit;


use crate::agent::SubprocessGateway;
use crate::cli::{Command, CredentialsAction, EventsAction};
use crate::config::Config;
use crate::context::DataContext;
use crate::credentials::FileCredentialStore;
use crate::error::{FilingError, Result};
use crate::events::EventLog;
use crate::notify::AuditNotifier;
use crate::session::ConfiguredSessions;
use crate::submission::{Collaborators, Orchestrator, ThreadPause};
use serde::Serialize;

pub use credentials::{cmd_credentials_init, cmd_credentials_set, cmd_credentials_status};
pub use events::{cmd_events_list, cmd_events_summary};
pub use flow::{cmd_flow, cmd_policy};
pub use submit::{cmd_batch, cmd_documents, cmd_submit};

/// Dispatch a command to its implementation.
///
/// `config` has already been loaded and had environment overrides applied.
pub fn dispatch(command: Command, ctx: &DataContext, config: &Config) -> Result<()> {
    match command {
        Command::Submit(args) => cmd_submit(ctx, config, args),
        Command::Batch(args) => cmd_batch(ctx, config, args),
        Command::Documents(args) => cmd_documents(ctx, config, args),
        Command::Flow(args) => cmd_flow(args),
        Command::Policy(args) => cmd_policy(config, args),
        Command::Credentials(credentials) => match credentials.action {
            CredentialsAction::Init => cmd_credentials_init(ctx),
            CredentialsAction::Set(args) => cmd_credentials_set(ctx, args),
            CredentialsAction::Status => cmd_credentials_status(ctx),
        },
        Command::Events(events) => match events.action {
            EventsAction::List(args) => cmd_events_list(ctx, args),
            EventsAction::Summary => cmd_events_summary(ctx),
        },
    }
}

/// Build an orchestrator over the local collaborators and run `f` with it.
fn with_orchestrator<T>(
    ctx: &DataContext,
    config: &Config,
    f: impl FnOnce(&Orchestrator<'_>) -> Result<T>,
) -> Result<T> {
    let gateway = SubprocessGateway::new(ctx, config)?;
    let credentials = FileCredentialStore::new(ctx);
    let sessions = ConfiguredSessions::from_config(config);
    let audit = EventLog::new(ctx.events_file());
    let notifier = AuditNotifier::new(&audit);

    let orchestrator = Orchestrator::new(
        Collaborators {
            gateway: &gateway,
            credentials: &credentials,
            sessions: &sessions,
            audit: &audit,
            notifier: &notifier,
            pause: &ThreadPause,
        },
        config,
    );
    f(&orchestrator)
}

/// Print a value as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| FilingError::UserError(format!("failed to render JSON output: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}
