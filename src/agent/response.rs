//! Agent responses and output parsing.
//!
//! An agent reports its outcome as a JSON object on the last non-blank line of
//! its standard output. Anything else it prints (progress, debug dumps) is
//! ignored. Agents that print no JSON at all are treated as stubs and produce a
//! simulated response carrying an excerpt of what they did print.

use crate::submission::{ExecutionMode, ExecutionPayload};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Characters of raw output kept in a synthesized response.
pub const RAW_EXCERPT_CHARS: usize = 400;

/// Where a response came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseOrigin {
    /// The agent printed a JSON result line.
    #[default]
    Structured,
    /// The agent printed text without a JSON result line.
    RawText,
    /// The agent exited cleanly without printing anything.
    Empty,
    /// No runtime candidate could start the agent.
    LaunchFailure,
    /// The agent started but crashed or timed out under every candidate.
    Crashed,
}

/// Outcome reported by (or synthesized for) one agent invocation.
///
/// Keys follow the agent protocol. Unknown keys are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub ok: bool,

    #[serde(rename = "simulado", default, skip_serializing_if = "std::ops::Not::not")]
    pub simulated: bool,

    #[serde(rename = "mensagem", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(rename = "erroOriginal", default, skip_serializing_if = "Option::is_none")]
    pub original_error: Option<String>,

    #[serde(rename = "statusExecucao", default, skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<String>,

    #[serde(rename = "protocolo", default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tribunal: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    #[serde(skip)]
    pub origin: ResponseOrigin,
}

impl AgentResponse {
    /// Text used to classify a failure: the message, or the underlying error
    /// when the message is blank.
    pub fn failure_text(&self) -> &str {
        match self.message.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => message,
            _ => self.original_error.as_deref().map(str::trim).unwrap_or(""),
        }
    }

    /// Message or empty string.
    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// Turn parsed agent output into a response for this payload.
    ///
    /// Empty output counts as a simulated success only in simulated mode. In
    /// real mode a silent agent is indistinguishable from one that died after
    /// exiting 0, so it is reported as a failure.
    pub fn from_output(output: AgentOutput, payload: &ExecutionPayload) -> Self {
        match output {
            AgentOutput::Structured(response) => response,
            AgentOutput::RawText(text) if text.is_empty() => match payload.mode {
                ExecutionMode::Simulated => Self {
                    ok: true,
                    simulated: true,
                    message: Some("Agent finished without an explicit result.".to_string()),
                    ..Self::for_payload(payload, ResponseOrigin::Empty)
                },
                ExecutionMode::Real => {
                    tracing::warn!(
                        protocol = %payload.protocol,
                        "agent exited cleanly in real mode without a result line"
                    );
                    Self {
                        ok: false,
                        message: Some(
                            "Agent finished without an explicit result in real mode.".to_string(),
                        ),
                        ..Self::for_payload(payload, ResponseOrigin::Empty)
                    }
                }
            },
            AgentOutput::RawText(text) => Self {
                ok: true,
                simulated: true,
                message: Some(truncate_chars(&text, RAW_EXCERPT_CHARS).to_string()),
                ..Self::for_payload(payload, ResponseOrigin::RawText)
            },
        }
    }

    /// Synthesized failure after every runtime candidate failed.
    ///
    /// `launched` tells whether at least one candidate got the agent running.
    /// If none did, the failure is a launch failure and will not be retried.
    pub fn unavailable(payload: &ExecutionPayload, last_error: Option<String>, launched: bool) -> Self {
        let origin = if launched {
            ResponseOrigin::Crashed
        } else {
            ResponseOrigin::LaunchFailure
        };
        Self {
            ok: false,
            simulated: true,
            message: Some(
                "Could not run the agent. Configure a runtime (COURTFILE_RUNTIME or `runtime` \
                 in config.yaml) or put python3 on PATH."
                    .to_string(),
            ),
            original_error: Some(last_error.unwrap_or_else(|| "unknown error".to_string())),
            ..Self::for_payload(payload, origin)
        }
    }

    fn for_payload(payload: &ExecutionPayload, origin: ResponseOrigin) -> Self {
        Self {
            protocol: Some(payload.protocol.clone()),
            tribunal: Some(payload.tribunal.id().to_string()),
            origin,
            ..Default::default()
        }
    }
}

/// Agent standard output, split by whether it carried a result line.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// The last non-blank line parsed as a response object.
    Structured(AgentResponse),
    /// Trimmed output without a parseable result line (possibly empty).
    RawText(String),
}

/// Parse agent standard output. Never fails.
pub fn parse_agent_output(stdout: &str) -> AgentOutput {
    let output = stdout.trim();
    let last_line = output.lines().filter(|line| !line.trim().is_empty()).last();

    match last_line.and_then(|line| serde_json::from_str::<AgentResponse>(line).ok()) {
        Some(response) => AgentOutput::Structured(response),
        None => AgentOutput::RawText(output.to_string()),
    }
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
