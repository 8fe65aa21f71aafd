//! Agent subprocess dispatch and execution.
//!
//! This module provides subprocess execution for agents with:
//!
//! - Payload delivery on stdin, closed after writing
//! - Configurable timeout with process termination
//! - Output capture to per-run log files

mod executor;

pub use executor::{AgentRun, Invocation, execute_candidate};
