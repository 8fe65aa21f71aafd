//! Gateway between the orchestrator and agent subprocesses.

use super::dispatch::{Invocation, execute_candidate};
use super::registry::{Tribunal, script_path};
use super::response::{AgentResponse, parse_agent_output};
use super::runtime::{RuntimeCandidate, runtime_candidates};
use crate::config::Config;
use crate::context::DataContext;
use crate::error::Result;
use crate::submission::ExecutionPayload;
use std::path::PathBuf;
use std::time::Duration;

/// Invokes the automation agent for one attempt.
///
/// Implementations never fail: every problem is folded into a failed
/// `AgentResponse` so the retry loop can classify it.
pub trait AgentGateway {
    fn invoke(&self, tribunal: Tribunal, payload: &ExecutionPayload, timeout: Duration)
    -> AgentResponse;
}

/// Runs agent scripts as local subprocesses.
#[derive(Debug, Clone)]
pub struct SubprocessGateway {
    agents_dir: PathBuf,
    logs_dir: PathBuf,
    candidates: Vec<RuntimeCandidate>,
}

impl SubprocessGateway {
    /// Build a gateway from the data context and config.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured runtime cannot be parsed.
    pub fn new(ctx: &DataContext, config: &Config) -> Result<Self> {
        Ok(Self {
            agents_dir: ctx.agents_dir(config),
            logs_dir: ctx.logs_dir.clone(),
            candidates: runtime_candidates(config.runtime.as_deref())?,
        })
    }

    /// Gateway with explicit directories and candidates.
    pub fn with_candidates(
        agents_dir: impl Into<PathBuf>,
        logs_dir: impl Into<PathBuf>,
        candidates: Vec<RuntimeCandidate>,
    ) -> Self {
        Self {
            agents_dir: agents_dir.into(),
            logs_dir: logs_dir.into(),
            candidates,
        }
    }
}

impl AgentGateway for SubprocessGateway {
    fn invoke(
        &self,
        tribunal: Tribunal,
        payload: &ExecutionPayload,
        timeout: Duration,
    ) -> AgentResponse {
        let script = match script_path(&self.agents_dir, tribunal.id()) {
            Ok(script) => script,
            Err(e) => return AgentResponse::unavailable(payload, Some(e.to_string()), false),
        };
        if !script.is_file() {
            return AgentResponse::unavailable(
                payload,
                Some(format!("agent script not found: {}", script.display())),
                false,
            );
        }

        let input = match serde_json::to_string(payload) {
            Ok(input) => input,
            Err(e) => {
                return AgentResponse::unavailable(
                    payload,
                    Some(format!("failed to serialize payload: {}", e)),
                    false,
                );
            }
        };

        let logs_dir = self.logs_dir.join(&payload.protocol);
        let invocation = Invocation {
            script: &script,
            input: &input,
            logs_dir: &logs_dir,
            timeout,
        };

        let mut last_error = None;
        let mut launched = false;

        for candidate in &self.candidates {
            tracing::debug!(
                protocol = %payload.protocol,
                command = %candidate.describe(&script),
                "trying agent runtime"
            );

            match execute_candidate(candidate, invocation) {
                Ok(run) if run.is_success() => match run.read_stdout() {
                    Ok(stdout) => {
                        tracing::debug!(
                            protocol = %payload.protocol,
                            duration_ms = run.duration.as_millis() as u64,
                            "agent exited cleanly"
                        );
                        return AgentResponse::from_output(parse_agent_output(&stdout), payload);
                    }
                    Err(e) => {
                        launched = true;
                        last_error = Some(e.to_string());
                    }
                },
                Ok(run) => {
                    launched = true;
                    let description = run.failure_description();
                    tracing::warn!(protocol = %payload.protocol, "{}", description);
                    last_error = Some(description);
                }
                Err(e) => {
                    tracing::debug!(protocol = %payload.protocol, error = %e, "runtime unavailable");
                    last_error = Some(e.to_string());
                }
            }
        }

        AgentResponse::unavailable(payload, last_error, launched)
    }
}
