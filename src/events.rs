//! Audit logging subsystem for courtfile.
//!
//! This module implements append-only event logging of every submission's
//! lifecycle. Events are stored in NDJSON format (one JSON object per line)
//! in `{data_dir}/events/events.ndjson`.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: The action performed (`envio_iniciado`, `envio_falhou`, ...)
//! - `actor`: The operator e-mail, or `user@HOST` for local actions
//! - `protocol`: Optional protocol code for submission events
//! - `details`: Freeform object with action-specific details
//!
//! Action names match the ones downstream reporting already reads, so they
//! stay in Portuguese.
//!
//! # Usage
//!
//! The orchestrator writes through the [`AuditSink`] trait and never lets an
//! audit failure change the outcome of a submission.
//!
//! ```no_run
//! use courtfile::events::{AuditSink, Event, EventAction, EventLog};
//! use serde_json::json;
//!
//! let log = EventLog::new(".courtfile/events/events.ndjson");
//! let event = Event::new(EventAction::SubmissionStarted)
//!     .with_protocol("TJSP-20240501-A1B2C3")
//!     .with_details(json!({"tribunal": "tjsp"}));
//! log.record(&event)?;
//! # Ok::<(), courtfile::error::FilingError>(())
//! ```

use crate::error::{FilingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default number of events returned by a listing.
pub const DEFAULT_LIST_LIMIT: usize = 50;
/// Largest number of events returned by a listing.
pub const MAX_LIST_LIMIT: usize = 500;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventAction {
    /// Submission validated and about to run its first attempt
    #[serde(rename = "envio_iniciado")]
    SubmissionStarted,
    /// One agent attempt started
    #[serde(rename = "envio_tentativa_iniciada")]
    AttemptStarted,
    /// A failed attempt will be retried
    #[serde(rename = "envio_tentativa_reprocesso")]
    AttemptRetry,
    /// Submission finished with status `sucesso`
    #[serde(rename = "envio_concluido")]
    SubmissionSucceeded,
    /// Submission finished with status `falha`
    #[serde(rename = "envio_falhou")]
    SubmissionFailed,
    /// A document in a document batch could not be submitted
    #[serde(rename = "envio_pdf_falhou")]
    DocumentFailed,
    /// A result notification was delivered
    #[serde(rename = "notificacao_enviada")]
    NotificationSent,
    /// The certificate record was replaced
    #[serde(rename = "certificado_atualizado")]
    CertificateUpdated,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::SubmissionStarted => "envio_iniciado",
            EventAction::AttemptStarted => "envio_tentativa_iniciada",
            EventAction::AttemptRetry => "envio_tentativa_reprocesso",
            EventAction::SubmissionSucceeded => "envio_concluido",
            EventAction::SubmissionFailed => "envio_falhou",
            EventAction::DocumentFailed => "envio_pdf_falhou",
            EventAction::NotificationSent => "notificacao_enviada",
            EventAction::CertificateUpdated => "certificado_atualizado",
        }
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event record for the audit log.
///
/// Events are serialized as single-line JSON objects and appended to
/// the events.ndjson file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// Who performed the action.
    pub actor: String,

    /// Protocol code for submission events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action.
    ///
    /// The timestamp is set to the current time, and the actor is
    /// determined from the environment (USER@HOSTNAME).
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            protocol: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the actor, typically the operator's e-mail.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Set the protocol code for this event.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            FilingError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Get the actor string for locally initiated events.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Destination for audit events.
///
/// Callers treat a failed `record` as a warning; it never aborts the operation
/// being audited.
pub trait AuditSink {
    fn record(&self, event: &Event) -> Result<()>;
}

/// Counts per action plus the most recent event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub total_events: usize,
    pub by_action: BTreeMap<String, usize>,
    pub last_event: Option<Event>,
}

/// Append-only NDJSON audit log.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every event in file order.
    ///
    /// A missing file is an empty log. Lines that do not parse are skipped
    /// with a warning so one bad write cannot hide the rest of the history.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            FilingError::UserError(format!(
                "failed to read events file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let mut events = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(line = index + 1, error = %e, "skipping malformed audit event");
                }
            }
        }
        Ok(events)
    }

    /// Most recent events first.
    ///
    /// `limit` is clamped to `1..=500`.
    pub fn list(&self, limit: usize) -> Result<Vec<Event>> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        let mut events = self.read_all()?;
        events.reverse();
        events.truncate(limit);
        Ok(events)
    }

    /// Count events per action.
    pub fn summary(&self) -> Result<EventSummary> {
        let events = self.read_all()?;
        let mut by_action = BTreeMap::new();
        for event in &events {
            *by_action.entry(event.action.to_string()).or_insert(0) += 1;
        }

        Ok(EventSummary {
            total_events: events.len(),
            by_action,
            last_event: events.last().cloned(),
        })
    }
}

impl AuditSink for EventLog {
    /// Append the event as a single JSON line, creating the file and its
    /// directory on first use.
    fn record(&self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;

        if let Some(events_dir) = self.path.parent()
            && !events_dir.exists()
        {
            fs::create_dir_all(events_dir).map_err(|e| {
                FilingError::UserError(format!(
                    "failed to create events directory '{}': {}",
                    events_dir.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                FilingError::UserError(format!(
                    "failed to open events file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            FilingError::UserError(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            FilingError::UserError(format!(
                "failed to sync events file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn temp_log() -> (TempDir, EventLog) {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::new(temp_dir.path().join("events").join("events.ndjson"));
        (temp_dir, log)
    }

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::SubmissionStarted);

        assert_eq!(event.action, EventAction::SubmissionStarted);
        assert!(event.actor.contains('@'));
        assert!(event.protocol.is_none());
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_builders() {
        let event = Event::new(EventAction::AttemptStarted)
            .with_actor("advogada@escritorio.com.br")
            .with_protocol("TJSP-20240501-0A1B2C")
            .with_details(json!({"tentativa": 1, "tentativasMax": 3}));

        assert_eq!(event.actor, "advogada@escritorio.com.br");
        assert_eq!(event.protocol.as_deref(), Some("TJSP-20240501-0A1B2C"));
        assert_eq!(event.details["tentativasMax"], 3);
    }

    #[test]
    fn test_action_wire_names() {
        let line = Event::new(EventAction::AttemptRetry).to_ndjson_line().unwrap();
        assert!(line.contains("\"envio_tentativa_reprocesso\""));
        assert!(!line.contains('\n'));

        assert_eq!(EventAction::SubmissionFailed.to_string(), "envio_falhou");
        assert_eq!(EventAction::DocumentFailed.to_string(), "envio_pdf_falhou");
    }

    #[test]
    fn test_event_without_protocol_omits_field() {
        let line = Event::new(EventAction::CertificateUpdated)
            .to_ndjson_line()
            .unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert!(parsed.get("protocol").is_none());
    }

    #[test]
    fn test_record_creates_file_and_dir() {
        let (_temp_dir, log) = temp_log();
        assert!(!log.path().exists());

        log.record(&Event::new(EventAction::SubmissionStarted)).unwrap();
        log.record(&Event::new(EventAction::SubmissionSucceeded).with_protocol("TRF3-1"))
            .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.ends_with('\n'));
        assert_eq!(content.lines().count(), 2);

        let events = log.read_all().unwrap();
        assert_eq!(events[0].action, EventAction::SubmissionStarted);
        assert_eq!(events[1].protocol.as_deref(), Some("TRF3-1"));
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let (_temp_dir, log) = temp_log();
        assert!(log.read_all().unwrap().is_empty());
        assert_eq!(log.summary().unwrap().total_events, 0);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (_temp_dir, log) = temp_log();
        log.record(&Event::new(EventAction::SubmissionStarted)).unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "{{not json").unwrap();
        log.record(&Event::new(EventAction::SubmissionFailed)).unwrap();

        assert_eq!(log.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_list_is_newest_first_and_clamped() {
        let (_temp_dir, log) = temp_log();
        for attempt in 1..=3 {
            log.record(
                &Event::new(EventAction::AttemptStarted).with_details(json!({"tentativa": attempt})),
            )
            .unwrap();
        }

        let events = log.list(2).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].details["tentativa"], 3);
        assert_eq!(events[1].details["tentativa"], 2);

        // A zero limit still returns one event.
        assert_eq!(log.list(0).unwrap().len(), 1);
    }

    #[test]
    fn test_summary_counts_per_action() {
        let (_temp_dir, log) = temp_log();
        log.record(&Event::new(EventAction::AttemptStarted)).unwrap();
        log.record(&Event::new(EventAction::AttemptStarted)).unwrap();
        log.record(&Event::new(EventAction::SubmissionSucceeded)).unwrap();

        let summary = log.summary().unwrap();
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.by_action.get("envio_tentativa_iniciada"), Some(&2));
        assert_eq!(summary.by_action.get("envio_concluido"), Some(&1));
        assert_eq!(
            summary.last_event.map(|e| e.action),
            Some(EventAction::SubmissionSucceeded)
        );
    }

    #[test]
    fn test_get_actor_string() {
        let actor = get_actor_string();
        assert!(actor.contains('@'));
    }
}
