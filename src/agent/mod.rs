//! Agent execution subsystem.
//!
//! Agents are external scripts, one per tribunal, that drive the court portal.
//! This module knows which script serves which tribunal, how to launch it, and
//! how to read its result:
//!
//! - **Registry**: tribunal identifiers, labels, and script names
//! - **Runtime**: ordered launch commands for the scripts
//! - **Dispatch**: subprocess execution with timeout and output capture
//! - **Response**: the result protocol and its parsing
//! - **Gateway**: the seam the orchestrator calls once per attempt
//!
//! The agent is opaque. Its contract is a JSON payload on stdin and a JSON
//! result object on the last non-blank line of stdout.

pub mod dispatch;
mod gateway;
mod registry;
mod response;
pub mod runtime;

// Re-export public API
pub use gateway::{AgentGateway, SubprocessGateway};
pub use registry::{Tribunal, script_for, script_path};
pub use response::{
    AgentOutput, AgentResponse, RAW_EXCERPT_CHARS, ResponseOrigin, parse_agent_output,
    truncate_chars,
};
pub use runtime::{RuntimeCandidate, runtime_candidates};
