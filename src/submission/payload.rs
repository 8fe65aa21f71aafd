//! The payload handed to an agent.

use super::request::ExecutionMode;
use crate::agent::Tribunal;
use crate::credentials::Credentials;
use crate::flow::{Channel, FlowMetadata, FlowResolution};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;

/// Everything an agent needs for one filing.
///
/// Built once per submission and sent unchanged to every attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPayload {
    #[serde(rename = "protocolo")]
    pub protocol: String,

    pub tribunal: Tribunal,

    #[serde(rename = "numeroProcesso")]
    pub case_number: String,

    #[serde(rename = "arquivo")]
    pub file: String,

    #[serde(rename = "descricao")]
    pub description: String,

    /// Operator e-mail.
    #[serde(rename = "usuario")]
    pub operator: String,

    #[serde(rename = "modoExecucao")]
    pub mode: ExecutionMode,

    #[serde(rename = "confirmarProtocolo")]
    pub confirm_protocol: bool,

    #[serde(rename = "certificado")]
    pub credentials: Credentials,

    pub timestamp: DateTime<Utc>,

    #[serde(rename = "canalPeticionamento", skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,

    #[serde(rename = "linkAcessoNormalizado", skip_serializing_if = "Option::is_none")]
    pub access_link: Option<String>,

    #[serde(rename = "tjsp", skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowTarget>,
}

/// Resolved TJSP navigation target as the agents read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowTarget {
    #[serde(rename = "canal")]
    pub channel: Channel,

    #[serde(rename = "entradaUrl")]
    pub entry_url: String,

    #[serde(rename = "portalUrl")]
    pub portal_url: String,

    #[serde(rename = "serviceUrl")]
    pub service_url: String,

    #[serde(rename = "loginUrl")]
    pub login_url: String,

    #[serde(rename = "fluxo")]
    pub flow: FlowMetadata,
}

impl From<&FlowResolution> for FlowTarget {
    fn from(resolution: &FlowResolution) -> Self {
        Self {
            channel: resolution.channel,
            entry_url: resolution.entry_url.clone(),
            portal_url: resolution.portal_url.clone(),
            service_url: resolution.service_url.clone(),
            login_url: resolution.login_url.clone(),
            flow: resolution.flow.clone(),
        }
    }
}

/// Generate a protocol code: `{TRIBUNAL}-{YYYYMMDD}-{6 hex digits}`.
///
/// # Example
///
/// ```no_run
/// use courtfile::agent::Tribunal;
/// use courtfile::submission::generate_protocol;
///
/// let protocol = generate_protocol(Tribunal::Trf3, chrono::Utc::now());
/// assert!(protocol.starts_with("TRF3-"));
/// ```
pub fn generate_protocol(tribunal: Tribunal, now: DateTime<Utc>) -> String {
    let mut suffix = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut suffix);
    format!(
        "{}-{}-{:02X}{:02X}{:02X}",
        tribunal.id().to_uppercase(),
        now.format("%Y%m%d"),
        suffix[0],
        suffix[1],
        suffix[2]
    )
}
