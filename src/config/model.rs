//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for courtfile.
///
/// This struct represents the contents of `{data_dir}/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
/// It is built once at startup and handed to the components that need it;
/// nothing below `main` reads the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Agent settings
    // =========================================================================
    /// Directory holding the agent scripts, relative to the data directory
    /// unless absolute.
    #[serde(default = "default_agents_dir")]
    pub agents_dir: String,

    /// Preferred runtime command for the agent scripts (e.g. `/opt/py/bin/python -u`).
    /// Tried before the conventional fallbacks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    // =========================================================================
    // Retry settings
    // =========================================================================
    /// Timeout and retry overrides.
    #[serde(default)]
    pub retry: RetrySettings,

    /// Extra failure phrases that stop the retry loop, in addition to the built-in ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terminal_phrases: Vec<String>,

    // =========================================================================
    // Session settings
    // =========================================================================
    /// Accepted session tokens mapped to the operator's e-mail.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sessions: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agents_dir: default_agents_dir(),
            runtime: None,
            retry: RetrySettings::default(),
            terminal_phrases: Vec::new(),
            sessions: BTreeMap::new(),
        }
    }
}
