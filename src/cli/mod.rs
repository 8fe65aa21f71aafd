//! CLI argument parsing for courtfile.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Courtfile: multi-tribunal e-filing orchestrator.
///
/// Each filing is handed to an external automation agent for its tribunal:
/// - TJSP links and channel hints are normalized into one navigation target
/// - Failed attempts are retried with exponential backoff unless the failure
///   cannot change between attempts
/// - Every step is recorded in an append-only audit log
#[derive(Parser, Debug)]
#[command(name = "courtfile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding config, credentials, and logs.
    #[arg(long, global = true, env = "COURTFILE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for courtfile.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit one filing.
    ///
    /// Prints the submission result, including every attempt, as JSON.
    Submit(SubmitArgs),

    /// Submit every filing listed in a YAML or JSON batch file.
    Batch(BatchArgs),

    /// Submit one filing per PDF, reading the case number from each document.
    Documents(DocumentsArgs),

    /// Resolve the TJSP navigation flow for a channel hint and access link.
    ///
    /// Pure: nothing is submitted or recorded.
    Flow(FlowArgs),

    /// Show the effective retry policy for an execution mode.
    Policy(PolicyArgs),

    /// Certificate credential commands.
    Credentials(CredentialsCommand),

    /// Audit log commands.
    Events(EventsCommand),
}

/// Session and execution options shared by the submitting commands.
#[derive(Parser, Debug, Clone)]
pub struct FilingOptions {
    /// Operator session token.
    #[arg(long, env = "COURTFILE_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Free-text filing description.
    #[arg(long, default_value = "")]
    pub description: String,

    /// TJSP channel hint (esaj or eproc).
    #[arg(long, default_value = "")]
    pub channel: String,

    /// TJSP access link pasted from the portal.
    #[arg(long, default_value = "")]
    pub link: String,

    /// Execution mode (simulado or real).
    #[arg(long, default_value = "simulado")]
    pub mode: String,

    /// Stop before confirming the protocol on the portal.
    #[arg(long)]
    pub no_confirm: bool,

    /// Notify a recipient (@telegram_handle or e-mail address). Repeatable.
    #[arg(long = "notify")]
    pub recipients: Vec<String>,
}

/// Arguments for the `submit` command.
#[derive(Parser, Debug)]
pub struct SubmitArgs {
    /// Tribunal identifier (tjsp, tjsp2, trf3, trt2).
    #[arg(long)]
    pub tribunal: String,

    /// Case number in CNJ format.
    #[arg(long)]
    pub case_number: String,

    /// Filing document path.
    #[arg(long)]
    pub file: String,

    #[command(flatten)]
    pub options: FilingOptions,
}

/// Arguments for the `batch` command.
#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Batch file: a list of filings.
    pub path: PathBuf,

    /// Operator session token.
    #[arg(long, env = "COURTFILE_TOKEN", hide_env_values = true)]
    pub token: String,
}

/// Arguments for the `documents` command.
#[derive(Parser, Debug)]
pub struct DocumentsArgs {
    /// PDF documents, one filing each.
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,

    /// Tribunal identifier (tjsp, tjsp2, trf3, trt2).
    #[arg(long)]
    pub tribunal: String,

    #[command(flatten)]
    pub options: FilingOptions,
}

/// Arguments for the `flow` command.
#[derive(Parser, Debug)]
pub struct FlowArgs {
    /// Channel hint (esaj or eproc).
    #[arg(long, default_value = "")]
    pub channel: String,

    /// Access link, in any encoding.
    #[arg(long, default_value = "")]
    pub link: String,
}

/// Arguments for the `policy` command.
#[derive(Parser, Debug)]
pub struct PolicyArgs {
    /// Execution mode (simulado or real).
    #[arg(long, default_value = "simulado")]
    pub mode: String,
}

/// Credential subcommands.
#[derive(Parser, Debug)]
pub struct CredentialsCommand {
    #[command(subcommand)]
    pub action: CredentialsAction,
}

/// Available credential actions.
#[derive(Subcommand, Debug)]
pub enum CredentialsAction {
    /// Provision the encryption key for stored credentials.
    ///
    /// Run once per data directory, before `credentials set`.
    Init,

    /// Store the A1 certificate and its password.
    Set(CredentialsSetArgs),

    /// Show whether credentials are configured. Never prints the password.
    Status,
}

/// Arguments for the `credentials set` command.
#[derive(Parser, Debug)]
pub struct CredentialsSetArgs {
    /// Certificate file (.pfx or .p12).
    pub certificate: PathBuf,

    /// Certificate password.
    #[arg(long, env = "COURTFILE_CERT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Audit log subcommands.
#[derive(Parser, Debug)]
pub struct EventsCommand {
    #[command(subcommand)]
    pub action: EventsAction,
}

/// Available audit log actions.
#[derive(Subcommand, Debug)]
pub enum EventsAction {
    /// List recent events, newest first.
    List(EventsListArgs),

    /// Count events per action and show the latest one.
    Summary,
}

/// Arguments for the `events list` command.
#[derive(Parser, Debug)]
pub struct EventsListArgs {
    /// Number of events to show (1 to 500).
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
