//! The submission state machine.
//!
//! `Validating -> FlowResolved -> Attempting(n) -> {Succeeded | Exhausted}`.
//! Everything that can go wrong before the first attempt is returned as an
//! error. From the first attempt on, the orchestrator always produces a
//! `SubmissionResult`.

use super::payload::{ExecutionPayload, FlowTarget, generate_protocol};
use super::request::SubmissionRequest;
use super::result::{AttemptRecord, SubmissionResult, SubmissionStatus};
use crate::agent::{AgentGateway, AgentResponse, truncate_chars};
use crate::config::{Config, RetrySettings};
use crate::credentials::CredentialStore;
use crate::error::{FilingError, Result};
use crate::events::{AuditSink, Event, EventAction};
use crate::flow::resolve_flow;
use crate::notify::{NotificationReport, Notifier};
use crate::retry::{FailureClassifier, RetryPolicy};
use crate::session::{Session, SessionValidator};
use chrono::Utc;
use serde_json::json;
use std::time::Duration;

/// Characters of the failed attempt's message kept in a retry event.
const RETRY_EVENT_MESSAGE_CHARS: usize = 300;

/// Waits between attempts.
pub trait Pause {
    fn pause(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// External collaborators of the orchestrator.
pub struct Collaborators<'a> {
    pub gateway: &'a dyn AgentGateway,
    pub credentials: &'a dyn CredentialStore,
    pub sessions: &'a dyn SessionValidator,
    pub audit: &'a dyn AuditSink,
    pub notifier: &'a dyn Notifier,
    pub pause: &'a dyn Pause,
}

/// Drives one filing from request to result.
pub struct Orchestrator<'a> {
    collaborators: Collaborators<'a>,
    retry: RetrySettings,
    classifier: FailureClassifier,
}

impl<'a> Orchestrator<'a> {
    pub fn new(collaborators: Collaborators<'a>, config: &Config) -> Self {
        Self {
            collaborators,
            retry: config.retry.clone(),
            classifier: FailureClassifier::new(config.normalized_terminal_phrases()),
        }
    }

    /// Resolve a session token.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when the token is unknown or expired.
    pub fn authenticate(&self, token: &str) -> Result<Session> {
        self.collaborators
            .sessions
            .validate(token)
            .ok_or(FilingError::Unauthorized)
    }

    /// Record an audit event. Failures are logged and otherwise ignored.
    pub fn audit(&self, event: Event) {
        if let Err(e) = self.collaborators.audit.record(&event) {
            tracing::warn!(action = %event.action, error = %e, "audit event not recorded");
        }
    }

    /// Submit one filing.
    ///
    /// # Errors
    ///
    /// * `Unauthorized` - the session token is not valid
    /// * `Validation` - a required field is missing or invalid
    /// * `InvalidChannel`, `ChannelMismatch`, `UnresolvableLink` - the TJSP
    ///   flow could not be resolved
    /// * `Credentials` - no certificate is configured
    ///
    /// No attempt is made in any of these cases. Agent failures are not
    /// errors: they end up in the result with status `falha`.
    pub fn submit(&self, token: &str, request: &SubmissionRequest) -> Result<SubmissionResult> {
        let session = self.authenticate(token)?;
        let fields = request.validate()?;

        let protocol = generate_protocol(fields.tribunal, Utc::now());
        let flow = if fields.tribunal.requires_flow() {
            Some(resolve_flow(&request.channel, &request.access_link)?)
        } else {
            None
        };
        let credentials = self.collaborators.credentials.credentials()?;

        let payload = ExecutionPayload {
            protocol: protocol.clone(),
            tribunal: fields.tribunal,
            case_number: fields.case_number,
            file: fields.file,
            description: request.description.trim().to_string(),
            operator: session.operator.clone(),
            mode: fields.mode,
            confirm_protocol: request.confirm_protocol,
            credentials,
            timestamp: Utc::now(),
            channel: flow.as_ref().map(|f| f.channel),
            access_link: flow.as_ref().map(|f| f.access_link.clone()),
            flow: flow.as_ref().map(FlowTarget::from),
        };

        let certificate_name = payload
            .credentials
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        self.audit(
            Event::new(EventAction::SubmissionStarted)
                .with_actor(&session.operator)
                .with_protocol(&protocol)
                .with_details(json!({
                    "tribunal": payload.tribunal,
                    "numeroProcesso": payload.case_number,
                    "certificado": certificate_name,
                    "canalPeticionamento": payload.channel,
                    "linkAcessoNormalizado": payload.access_link,
                    "fluxoTjsp": flow.as_ref().map(|f| &f.flow),
                    "modoExecucao": payload.mode,
                    "confirmarProtocolo": payload.confirm_protocol,
                })),
        );

        let policy = RetryPolicy::resolve(payload.mode, &self.retry);
        tracing::info!(
            protocol = %protocol,
            tribunal = %payload.tribunal,
            mode = %payload.mode,
            max_attempts = policy.max_attempts,
            "submission started"
        );

        let (response, attempts) = self.run_attempts(&session, &payload, &policy);

        let status = if response.ok {
            SubmissionStatus::Success
        } else {
            SubmissionStatus::Failure
        };
        let mut result = SubmissionResult {
            ok: response.ok,
            status,
            protocol: protocol.clone(),
            tribunal: payload.tribunal,
            tribunal_label: payload.tribunal.label().to_string(),
            case_number: payload.case_number.clone(),
            channel: payload.channel,
            access_link: payload.access_link.clone(),
            flow: flow.map(|f| f.flow),
            mode: payload.mode,
            confirm_protocol: payload.confirm_protocol,
            attempts_executed: attempts.len() as u32,
            final_attempt: attempts.last().map(|a| a.attempt).unwrap_or(0),
            attempts,
            response,
            completed_at: Utc::now(),
            notifications: NotificationReport::default(),
        };

        let action = match status {
            SubmissionStatus::Success => EventAction::SubmissionSucceeded,
            SubmissionStatus::Failure => EventAction::SubmissionFailed,
        };
        self.audit(
            Event::new(action)
                .with_actor(&session.operator)
                .with_protocol(&protocol)
                .with_details(json!({
                    "status": result.status,
                    "tribunal": result.tribunal,
                    "numeroProcesso": result.case_number,
                    "tentativasExecutadas": result.attempts_executed,
                    "tentativaFinal": result.final_attempt,
                })),
        );
        tracing::info!(
            protocol = %protocol,
            status = result.status.as_str(),
            attempts = result.attempts_executed,
            "submission finished"
        );

        result.notifications = self
            .collaborators
            .notifier
            .notify(&request.recipients, &result);

        Ok(result)
    }

    /// The attempt loop. Returns the last response and the attempt history.
    fn run_attempts(
        &self,
        session: &Session,
        payload: &ExecutionPayload,
        policy: &RetryPolicy,
    ) -> (AgentResponse, Vec<AttemptRecord>) {
        let mut delays = policy.delays();
        let mut attempts = Vec::new();
        let mut last = None;

        for attempt in 1..=policy.max_attempts {
            self.audit(
                Event::new(EventAction::AttemptStarted)
                    .with_actor(&session.operator)
                    .with_protocol(&payload.protocol)
                    .with_details(json!({
                        "tribunal": payload.tribunal,
                        "tentativa": attempt,
                        "tentativasMax": policy.max_attempts,
                        "modoExecucao": payload.mode,
                    })),
            );
            tracing::info!(protocol = %payload.protocol, attempt, "invoking agent");

            let response = self.collaborators.gateway.invoke(
                payload.tribunal,
                payload,
                policy.attempt_timeout(),
            );
            attempts.push(AttemptRecord::from_response(attempt, &response));

            if response.ok
                || attempt >= policy.max_attempts
                || !self.classifier.should_retry(&response)
            {
                last = Some(response);
                break;
            }

            let wait = delays.next().unwrap_or(Duration::ZERO);
            self.audit(
                Event::new(EventAction::AttemptRetry)
                    .with_actor(&session.operator)
                    .with_protocol(&payload.protocol)
                    .with_details(json!({
                        "tribunal": payload.tribunal,
                        "tentativaFalhou": attempt,
                        "proximaTentativa": attempt + 1,
                        "delayMs": wait.as_millis() as u64,
                        "mensagem": truncate_chars(response.message_text(), RETRY_EVENT_MESSAGE_CHARS),
                    })),
            );
            tracing::warn!(
                protocol = %payload.protocol,
                attempt,
                delay_ms = wait.as_millis() as u64,
                message = response.message_text(),
                "attempt failed, retrying"
            );

            if !wait.is_zero() {
                self.collaborators.pause.pause(wait);
            }
            last = Some(response);
        }

        let response = last.unwrap_or_else(|| AgentResponse {
            ok: false,
            message: Some("agent returned no valid response".to_string()),
            protocol: Some(payload.protocol.clone()),
            tribunal: Some(payload.tribunal.id().to_string()),
            ..Default::default()
        });
        (response, attempts)
    }
}
