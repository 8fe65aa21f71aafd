//! Filing requests as supplied by operators and batch files.

use crate::agent::Tribunal;
use crate::error::{FilingError, Result};
use crate::notify::Recipient;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Whether the agent should really file or only rehearse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    #[default]
    #[serde(rename = "simulado")]
    Simulated,
    #[serde(rename = "real")]
    Real,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Simulated => "simulado",
            ExecutionMode::Real => "real",
        }
    }

    /// Parse an operator-supplied mode. Blank means simulated.
    pub fn parse(raw: &str) -> Result<Self> {
        let mode = raw.trim().to_lowercase();
        match mode.as_str() {
            "" | "simulado" | "simulated" => Ok(ExecutionMode::Simulated),
            "real" => Ok(ExecutionMode::Real),
            _ => Err(FilingError::Validation(format!(
                "unknown execution mode '{}'. Use 'simulado' or 'real'.",
                mode
            ))),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_confirm_protocol() -> bool {
    true
}

/// One filing as requested, before validation.
///
/// Fields stay as written so that validation can report what was wrong with
/// them. Batch files may use either the agent's key names or the English ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub tribunal: String,

    #[serde(rename = "numeroProcesso", alias = "case_number", default)]
    pub case_number: String,

    #[serde(rename = "arquivo", alias = "file", default)]
    pub file: String,

    #[serde(rename = "descricao", alias = "description", default)]
    pub description: String,

    /// TJSP channel hint (`esaj`, `eproc` or blank).
    #[serde(rename = "canalPeticionamento", alias = "channel", default)]
    pub channel: String,

    /// Portal link pasted by the operator, in any encoding.
    #[serde(rename = "linkAcesso", alias = "link", default)]
    pub access_link: String,

    #[serde(rename = "modoExecucao", alias = "mode", default)]
    pub mode: String,

    #[serde(
        rename = "confirmarProtocolo",
        alias = "confirm_protocol",
        default = "default_confirm_protocol"
    )]
    pub confirm_protocol: bool,

    #[serde(rename = "destinatarios", alias = "recipients", default)]
    pub recipients: Vec<Recipient>,
}

impl Default for SubmissionRequest {
    fn default() -> Self {
        Self {
            tribunal: String::new(),
            case_number: String::new(),
            file: String::new(),
            description: String::new(),
            channel: String::new(),
            access_link: String::new(),
            mode: String::new(),
            confirm_protocol: default_confirm_protocol(),
            recipients: Vec::new(),
        }
    }
}

/// Required fields of a request after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFields {
    pub tribunal: Tribunal,
    pub case_number: String,
    pub file: String,
    pub mode: ExecutionMode,
}

impl SubmissionRequest {
    /// Check the required fields.
    ///
    /// # Errors
    ///
    /// `Validation` when the tribunal is unknown, the case number or file is
    /// blank, or the execution mode is not recognized.
    pub fn validate(&self) -> Result<ValidatedFields> {
        let tribunal = Tribunal::from_id(&self.tribunal).ok_or_else(|| {
            FilingError::Validation(format!(
                "unknown tribunal '{}'. Use: tjsp, tjsp2, trf3 or trt2.",
                self.tribunal.trim()
            ))
        })?;

        let case_number = self.case_number.trim();
        if case_number.is_empty() {
            return Err(FilingError::Validation(
                "case number is required".to_string(),
            ));
        }

        let file = self.file.trim();
        if file.is_empty() {
            return Err(FilingError::Validation("file is required".to_string()));
        }

        Ok(ValidatedFields {
            tribunal,
            case_number: case_number.to_string(),
            file: file.to_string(),
            mode: ExecutionMode::parse(&self.mode)?,
        })
    }
}

/// Fields shared by every filing of a document batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFields {
    #[serde(default)]
    pub tribunal: String,

    #[serde(rename = "descricao", alias = "description", default)]
    pub description: String,

    #[serde(rename = "canalPeticionamento", alias = "channel", default)]
    pub channel: String,

    #[serde(rename = "linkAcesso", alias = "link", default)]
    pub access_link: String,

    #[serde(rename = "modoExecucao", alias = "mode", default)]
    pub mode: String,

    #[serde(
        rename = "confirmarProtocolo",
        alias = "confirm_protocol",
        default = "default_confirm_protocol"
    )]
    pub confirm_protocol: bool,

    #[serde(rename = "destinatarios", alias = "recipients", default)]
    pub recipients: Vec<Recipient>,
}

impl Default for SharedFields {
    fn default() -> Self {
        Self {
            tribunal: String::new(),
            description: String::new(),
            channel: String::new(),
            access_link: String::new(),
            mode: String::new(),
            confirm_protocol: default_confirm_protocol(),
            recipients: Vec::new(),
        }
    }
}

impl SharedFields {
    /// The request for one document of the batch.
    pub fn request_for(&self, case_number: &str, document: &Path) -> SubmissionRequest {
        SubmissionRequest {
            tribunal: self.tribunal.clone(),
            case_number: case_number.to_string(),
            file: document.to_string_lossy().into_owned(),
            description: self.description.clone(),
            channel: self.channel.clone(),
            access_link: self.access_link.clone(),
            mode: self.mode.clone(),
            confirm_protocol: self.confirm_protocol,
            recipients: self.recipients.clone(),
        }
    }
}
