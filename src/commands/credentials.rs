//! Implementation of the `courtfile credentials` commands.

use super::print_json;
use crate::cli::CredentialsSetArgs;
use crate::context::DataContext;
use crate::credentials::FileCredentialStore;
use crate::error::Result;
use crate::events::{AuditSink, Event, EventAction, EventLog};
use serde_json::json;

/// Execute the `courtfile credentials init` command.
pub fn cmd_credentials_init(ctx: &DataContext) -> Result<()> {
    let store = FileCredentialStore::new(ctx);
    if store.provision_key()? {
        println!(
            "Provisioned encryption key at {}",
            ctx.credential_key_path().display()
        );
    } else {
        println!(
            "Encryption key already present at {}",
            ctx.credential_key_path().display()
        );
    }
    Ok(())
}

/// Execute the `courtfile credentials set` command.
pub fn cmd_credentials_set(ctx: &DataContext, args: CredentialsSetArgs) -> Result<()> {
    let store = FileCredentialStore::new(ctx);
    let status = store.save(&args.certificate, &args.password)?;

    let event = Event::new(EventAction::CertificateUpdated).with_details(json!({
        "arquivo": status.file,
    }));
    if let Err(e) = EventLog::new(ctx.events_file()).record(&event) {
        tracing::warn!(error = %e, "failed to log certificate update");
    }

    print_json(&status)
}

/// Execute the `courtfile credentials status` command.
pub fn cmd_credentials_status(ctx: &DataContext) -> Result<()> {
    print_json(&FileCredentialStore::new(ctx).status()?)
}
