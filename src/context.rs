//! Data directory context resolution for courtfile.
//!
//! Everything courtfile persists lives under one data directory: the config
//! file, the audit log, agent run logs, and the credential record. Commands
//! resolve this context once and derive every path from it.

use crate::config::Config;
use crate::error::{FilingError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Default data directory relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = ".courtfile";

/// Resolved paths for the courtfile data directory.
///
/// All paths are absolute.
#[derive(Debug, Clone)]
pub struct DataContext {
    /// Root of all persisted state (default: `{cwd}/.courtfile/`).
    pub data_dir: PathBuf,

    /// Audit log directory (`{data_dir}/events/`).
    pub events_dir: PathBuf,

    /// Agent run logs, one subdirectory per protocol (`{data_dir}/logs/`).
    pub logs_dir: PathBuf,

    /// Certificate copy, encrypted record, and key (`{data_dir}/credentials/`).
    pub credentials_dir: PathBuf,
}

impl DataContext {
    /// Resolve the context from the current working directory.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Explicit data directory (`--data-dir` / `COURTFILE_DATA_DIR`)
    pub fn resolve(data_dir: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            FilingError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Ok(Self::resolve_from(&cwd, data_dir))
    }

    /// Resolve the context relative to a specific directory.
    ///
    /// A relative `data_dir` is joined to `cwd`; an absolute one is used as is.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P, data_dir: Option<&Path>) -> Self {
        let data_dir = cwd
            .as_ref()
            .join(data_dir.unwrap_or(Path::new(DEFAULT_DATA_DIR)));

        Self {
            events_dir: data_dir.join("events"),
            logs_dir: data_dir.join("logs"),
            credentials_dir: data_dir.join("credentials"),
            data_dir,
        }
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.yaml")
    }

    /// Get the path to the main events log file.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir.join("events.ndjson")
    }

    /// Get the path to the encrypted credential record.
    pub fn credential_record_path(&self) -> PathBuf {
        self.credentials_dir.join("certificate.json")
    }

    /// Get the path to the credential encryption key.
    pub fn credential_key_path(&self) -> PathBuf {
        self.credentials_dir.join("master.key")
    }

    /// Get the directory holding agent scripts.
    ///
    /// `agents_dir` from the config is taken relative to the data directory
    /// unless it is absolute.
    pub fn agents_dir(&self, config: &Config) -> PathBuf {
        self.data_dir.join(&config.agents_dir)
    }

    /// Load the config file, or defaults when it does not exist.
    pub fn load_config(&self) -> Result<Config> {
        Config::load(self.config_path())
    }
}
