//! Implementation of the `courtfile flow` and `courtfile policy` commands.
//!
//! Both are read-only previews of what a submission would use.

use super::print_json;
use crate::cli::{FlowArgs, PolicyArgs};
use crate::config::Config;
use crate::error::Result;
use crate::flow::resolve_flow;
use crate::retry::RetryPolicy;
use crate::submission::ExecutionMode;

/// Execute the `courtfile flow` command.
pub fn cmd_flow(args: FlowArgs) -> Result<()> {
    let resolution = resolve_flow(&args.channel, &args.link)?;
    print_json(&resolution)
}

/// Execute the `courtfile policy` command.
pub fn cmd_policy(config: &Config, args: PolicyArgs) -> Result<()> {
    let mode = ExecutionMode::parse(&args.mode)?;
    print_json(&RetryPolicy::resolve(mode, &config.retry))
}
