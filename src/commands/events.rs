//! Implementation of the `courtfile events` commands.

use super::print_json;
use crate::cli::EventsListArgs;
use crate::context::DataContext;
use crate::error::Result;
use crate::events::EventLog;

/// Execute the `courtfile events list` command.
pub fn cmd_events_list(ctx: &DataContext, args: EventsListArgs) -> Result<()> {
    print_json(&EventLog::new(ctx.events_file()).list(args.limit)?)
}

/// Execute the `courtfile events summary` command.
pub fn cmd_events_summary(ctx: &DataContext) -> Result<()> {
    print_json(&EventLog::new(ctx.events_file()).summary()?)
}
