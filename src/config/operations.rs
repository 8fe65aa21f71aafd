//! Config loading, validation, and environment override operations.

use super::model::Config;
use super::types::Knob;
use crate::error::{FilingError, Result};
use std::path::Path;

/// Environment variable overriding the per-attempt timeout.
pub const ENV_TIMEOUT_MS: &str = "COURTFILE_TIMEOUT_MS";
/// Environment variable overriding the maximum attempts.
pub const ENV_RETRY_MAX: &str = "COURTFILE_RETRY_MAX";
/// Environment variable overriding the initial retry delay.
pub const ENV_RETRY_DELAY_MS: &str = "COURTFILE_RETRY_DELAY_MS";
/// Environment variable overriding the backoff factor.
pub const ENV_RETRY_BACKOFF_FACTOR: &str = "COURTFILE_RETRY_BACKOFF_FACTOR";
/// Environment variable overriding the maximum retry delay.
pub const ENV_RETRY_DELAY_MAX_MS: &str = "COURTFILE_RETRY_DELAY_MAX_MS";
/// Environment variable naming the preferred agent runtime.
pub const ENV_RUNTIME: &str = "COURTFILE_RUNTIME";

impl Config {
    /// Load config from a YAML file.
    ///
    /// Returns the default config when the file does not exist.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(FilingError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            FilingError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| FilingError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            FilingError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `agents_dir` must not be empty
    /// - `terminal_phrases` entries must not be blank
    /// - `sessions` tokens and operator e-mails must not be blank
    ///
    /// Numeric knobs are never rejected here; out-of-range values are clamped
    /// and non-numeric values fall back to defaults where they are consumed.
    pub fn validate(&self) -> Result<()> {
        if self.agents_dir.trim().is_empty() {
            return Err(FilingError::UserError(
                "config validation failed: agents_dir must not be empty".to_string(),
            ));
        }

        if self.terminal_phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(FilingError::UserError(
                "config validation failed: terminal_phrases entries must be non-empty".to_string(),
            ));
        }

        for (token, operator) in &self.sessions {
            if token.trim().is_empty() || operator.trim().is_empty() {
                return Err(FilingError::UserError(
                    "config validation failed: sessions entries need a token and an operator"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Apply `COURTFILE_*` overrides from an environment snapshot.
    ///
    /// Blank values are ignored. Called once at startup with `std::env::vars()`.
    pub fn apply_env_overrides<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            let knob = || Some(Knob::Text(value.to_string()));
            match key.as_ref() {
                ENV_TIMEOUT_MS => self.retry.timeout_ms = knob(),
                ENV_RETRY_MAX => self.retry.max_attempts = knob(),
                ENV_RETRY_DELAY_MS => self.retry.initial_delay_ms = knob(),
                ENV_RETRY_BACKOFF_FACTOR => self.retry.backoff_factor = knob(),
                ENV_RETRY_DELAY_MAX_MS => self.retry.max_delay_ms = knob(),
                ENV_RUNTIME => self.runtime = Some(value.to_string()),
                _ => {}
            }
        }
    }

    /// Terminal phrases configured on top of the built-in list, lower-cased.
    pub fn normalized_terminal_phrases(&self) -> Vec<String> {
        self.terminal_phrases
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect()
    }
}
