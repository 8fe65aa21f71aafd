//! Submission orchestration.
//!
//! One submission turns a [`SubmissionRequest`] into a [`SubmissionResult`]:
//!
//! 1. Session check and field validation
//! 2. Protocol code generation (once, stable across retries)
//! 3. TJSP flow resolution for `tjsp`/`tjsp2`
//! 4. Credential snapshot and payload construction
//! 5. Retry policy resolution from the execution mode
//! 6. The attempt loop around the agent gateway
//! 7. Result assembly and best-effort notifications
//!
//! Lifecycle events go to the audit sink; they never influence control flow.

mod orchestrator;
mod payload;
mod request;
mod result;

#[cfg(test)]
mod tests;

pub use orchestrator::{Collaborators, Orchestrator, Pause, ThreadPause};
pub use payload::{ExecutionPayload, FlowTarget, generate_protocol};
pub use request::{ExecutionMode, SharedFields, SubmissionRequest, ValidatedFields};
pub use result::{ATTEMPT_MESSAGE_CHARS, AttemptRecord, SubmissionResult, SubmissionStatus};
