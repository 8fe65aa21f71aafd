//! Implementation of the `courtfile submit`, `batch` and `documents` commands.

use super::{print_json, with_orchestrator};
use crate::batch::{BatchCoordinator, BatchResult};
use crate::cli::{BatchArgs, DocumentsArgs, FilingOptions, SubmitArgs};
use crate::config::Config;
use crate::context::DataContext;
use crate::error::{FilingError, Result};
use crate::extract::PdfCaseNumberExtractor;
use crate::notify::Recipient;
use crate::submission::{SharedFields, SubmissionRequest};
use std::fs;
use std::path::Path;

fn recipients(options: &FilingOptions) -> Vec<Recipient> {
    options
        .recipients
        .iter()
        .map(|address| Recipient::Address(address.clone()))
        .collect()
}

/// Execute the `courtfile submit` command.
///
/// Prints the result as JSON. A submission that ran but ended in `falha`
/// still prints its result, then exits with the submission failure code.
pub fn cmd_submit(ctx: &DataContext, config: &Config, args: SubmitArgs) -> Result<()> {
    let request = SubmissionRequest {
        tribunal: args.tribunal,
        case_number: args.case_number,
        file: args.file,
        description: args.options.description.clone(),
        channel: args.options.channel.clone(),
        access_link: args.options.link.clone(),
        mode: args.options.mode.clone(),
        confirm_protocol: !args.options.no_confirm,
        recipients: recipients(&args.options),
    };

    let result = with_orchestrator(ctx, config, |orchestrator| {
        orchestrator.submit(&args.options.token, &request)
    })?;
    print_json(&result)?;

    if result.ok {
        Ok(())
    } else {
        Err(FilingError::SubmissionFailed(format!(
            "protocol {} finished with status {} after {} attempt(s)",
            result.protocol,
            result.status.as_str(),
            result.attempts_executed
        )))
    }
}

/// Read a batch file: a YAML (or JSON) list of filings.
pub fn load_batch_file(path: &Path) -> Result<Vec<SubmissionRequest>> {
    let raw = fs::read_to_string(path).map_err(|e| {
        FilingError::UserError(format!(
            "failed to read batch file '{}': {}",
            path.display(),
            e
        ))
    })?;
    serde_yaml::from_str(&raw).map_err(|e| {
        FilingError::UserError(format!(
            "failed to parse batch file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Execute the `courtfile batch` command.
pub fn cmd_batch(ctx: &DataContext, config: &Config, args: BatchArgs) -> Result<()> {
    let requests = load_batch_file(&args.path)?;

    let batch = with_orchestrator(ctx, config, |orchestrator| {
        BatchCoordinator::new(orchestrator, &PdfCaseNumberExtractor)
            .submit_many(&args.token, &requests)
    })?;
    finish_batch(&batch)
}

/// Execute the `courtfile documents` command.
pub fn cmd_documents(ctx: &DataContext, config: &Config, args: DocumentsArgs) -> Result<()> {
    let shared = SharedFields {
        tribunal: args.tribunal,
        description: args.options.description.clone(),
        channel: args.options.channel.clone(),
        access_link: args.options.link.clone(),
        mode: args.options.mode.clone(),
        confirm_protocol: !args.options.no_confirm,
        recipients: recipients(&args.options),
    };

    let batch = with_orchestrator(ctx, config, |orchestrator| {
        BatchCoordinator::new(orchestrator, &PdfCaseNumberExtractor).submit_from_documents(
            &args.options.token,
            &args.documents,
            &shared,
        )
    })?;
    finish_batch(&batch)
}

fn finish_batch(batch: &BatchResult) -> Result<()> {
    print_json(batch)?;
    if batch.ok {
        Ok(())
    } else {
        Err(FilingError::SubmissionFailed(format!(
            "{} of {} filing(s) failed",
            batch.failed, batch.total
        )))
    }
}
