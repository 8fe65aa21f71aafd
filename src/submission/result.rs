//! Submission outcomes and attempt history.

use super::request::ExecutionMode;
use crate::agent::{AgentResponse, Tribunal, truncate_chars};
use crate::flow::{Channel, FlowMetadata};
use crate::notify::NotificationReport;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Characters of an agent message kept per attempt.
pub const ATTEMPT_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionStatus {
    #[serde(rename = "sucesso")]
    Success,
    #[serde(rename = "falha")]
    Failure,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Success => "sucesso",
            SubmissionStatus::Failure => "falha",
        }
    }
}

/// One agent invocation, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    #[serde(rename = "tentativa")]
    pub attempt: u32,

    pub ok: bool,

    #[serde(rename = "mensagem")]
    pub message: String,

    #[serde(rename = "statusExecucao")]
    pub execution_status: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn from_response(attempt: u32, response: &AgentResponse) -> Self {
        Self {
            attempt,
            ok: response.ok,
            message: truncate_chars(response.message_text(), ATTEMPT_MESSAGE_CHARS).to_string(),
            execution_status: response
                .execution_status
                .clone()
                .filter(|status| !status.is_empty()),
            timestamp: Utc::now(),
        }
    }
}

/// Final outcome of one submission.
///
/// `status` follows the last agent response; `attempts` holds every attempt
/// in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub ok: bool,

    pub status: SubmissionStatus,

    #[serde(rename = "protocolo")]
    pub protocol: String,

    pub tribunal: Tribunal,

    #[serde(rename = "tribunalLabel")]
    pub tribunal_label: String,

    #[serde(rename = "numeroProcesso")]
    pub case_number: String,

    #[serde(rename = "canalPeticionamento")]
    pub channel: Option<Channel>,

    #[serde(rename = "linkAcessoNormalizado")]
    pub access_link: Option<String>,

    #[serde(rename = "fluxoTjsp")]
    pub flow: Option<FlowMetadata>,

    #[serde(rename = "modoExecucao")]
    pub mode: ExecutionMode,

    #[serde(rename = "confirmarProtocolo")]
    pub confirm_protocol: bool,

    #[serde(rename = "tentativasExecutadas")]
    pub attempts_executed: u32,

    #[serde(rename = "tentativaFinal")]
    pub final_attempt: u32,

    #[serde(rename = "historicoTentativas")]
    pub attempts: Vec<AttemptRecord>,

    #[serde(rename = "respostaRobo")]
    pub response: AgentResponse,

    #[serde(rename = "concluidoEm")]
    pub completed_at: DateTime<Utc>,

    #[serde(rename = "notificacoes")]
    pub notifications: NotificationReport,
}
