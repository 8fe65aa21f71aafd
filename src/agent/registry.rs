//! Registry of known tribunals and their agent scripts.

use crate::error::{FilingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A court the crate can file with. Each one has exactly one agent script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Tribunal {
    Tjsp,
    Tjsp2,
    Trf3,
    Trt2,
}

impl Tribunal {
    pub const ALL: [Tribunal; 4] = [
        Tribunal::Tjsp,
        Tribunal::Tjsp2,
        Tribunal::Trf3,
        Tribunal::Trt2,
    ];

    /// Lower-case identifier used on the wire and in configuration.
    pub fn id(&self) -> &'static str {
        match self {
            Tribunal::Tjsp => "tjsp",
            Tribunal::Tjsp2 => "tjsp2",
            Tribunal::Trf3 => "trf3",
            Tribunal::Trt2 => "trt2",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Tribunal::Tjsp => "TJSP",
            Tribunal::Tjsp2 => "TJSP 2 Grau",
            Tribunal::Trf3 => "TRF3",
            Tribunal::Trt2 => "TRT2",
        }
    }

    /// File name of the agent script under the agents directory.
    pub fn agent_script(&self) -> &'static str {
        match self {
            Tribunal::Tjsp => "robo_tjsp.py",
            Tribunal::Tjsp2 => "robo_tjsp2.py",
            Tribunal::Trf3 => "robo_trf3.py",
            Tribunal::Trt2 => "robo_trt2.py",
        }
    }

    /// Whether filings for this tribunal need e-SAJ/eproc flow resolution.
    pub fn requires_flow(&self) -> bool {
        matches!(self, Tribunal::Tjsp | Tribunal::Tjsp2)
    }

    /// Parse an identifier, ignoring surrounding whitespace and case.
    pub fn from_id(raw: &str) -> Option<Self> {
        let id = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.id() == id)
    }
}

impl fmt::Display for Tribunal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tribunal {
    type Err = FilingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_id(s).ok_or_else(|| FilingError::UnknownAgent(s.trim().to_string()))
    }
}

impl TryFrom<String> for Tribunal {
    type Error = FilingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Resolve the agent script name for an agent identifier.
///
/// # Errors
///
/// Returns `FilingError::UnknownAgent` for anything outside the four known tribunals.
pub fn script_for(agent_id: &str) -> Result<&'static str> {
    let tribunal: Tribunal = agent_id.parse()?;
    Ok(tribunal.agent_script())
}

/// Location of an agent's script inside an agents directory.
///
/// # Errors
///
/// Returns `FilingError::UnknownAgent` when `agent_id` names no known tribunal.
pub fn script_path(agents_dir: &Path, agent_id: &str) -> Result<PathBuf> {
    Ok(agents_dir.join(script_for(agent_id)?))
}
