use crate::agent::{AgentGateway, AgentResponse, Tribunal};
use crate::credentials::{CredentialStore, Credentials};
use crate::error::{FilingError, Result};
use crate::events::{AuditSink, Event, EventAction};
use crate::extract::CaseNumberExtractor;
use crate::flow::resolve_flow;
use crate::notify::{NotificationReport, Notifier, Recipient};
use crate::session::{Session, SessionValidator};
use crate::submission::{
    Collaborators, ExecutionMode, ExecutionPayload, FlowTarget, Pause, SubmissionResult,
    SubmissionStatus, generate_protocol,
};
use chrono::Utc;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::Duration;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) const VALID_TOKEN: &str = "tok-valid";
pub(crate) const OPERATOR: &str = "operadora@escritorio.com.br";

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

pub(crate) fn sample_credentials() -> Credentials {
    Credentials {
        file: PathBuf::from("/tmp/courtfile-test/certificate_a1.pfx"),
        secret: "segredo".to_string(),
    }
}

/// A TJSP payload on the default eproc flow.
pub(crate) fn sample_payload(mode: ExecutionMode) -> ExecutionPayload {
    let flow = resolve_flow("", "").unwrap();
    ExecutionPayload {
        protocol: generate_protocol(Tribunal::Tjsp, Utc::now()),
        tribunal: Tribunal::Tjsp,
        case_number: "1001234-56.2024.8.26.0100".to_string(),
        file: "/tmp/peticao.pdf".to_string(),
        description: "Juntada de documentos".to_string(),
        operator: OPERATOR.to_string(),
        mode,
        confirm_protocol: true,
        credentials: sample_credentials(),
        timestamp: Utc::now(),
        channel: Some(flow.channel),
        access_link: Some(flow.access_link.clone()),
        flow: Some(FlowTarget::from(&flow)),
    }
}

pub(crate) fn sample_result(status: SubmissionStatus) -> SubmissionResult {
    let payload = sample_payload(ExecutionMode::Simulated);
    let ok = status == SubmissionStatus::Success;
    let response = AgentResponse {
        ok,
        ..Default::default()
    };
    SubmissionResult {
        ok,
        status,
        protocol: payload.protocol.clone(),
        tribunal: payload.tribunal,
        tribunal_label: payload.tribunal.label().to_string(),
        case_number: payload.case_number.clone(),
        channel: payload.channel,
        access_link: payload.access_link.clone(),
        flow: payload.flow.map(|f| f.flow),
        mode: payload.mode,
        confirm_protocol: payload.confirm_protocol,
        attempts_executed: 1,
        final_attempt: 1,
        attempts: vec![crate::submission::AttemptRecord::from_response(1, &response)],
        response,
        completed_at: Utc::now(),
        notifications: NotificationReport::default(),
    }
}

pub(crate) fn ok_response(message: &str) -> AgentResponse {
    AgentResponse {
        ok: true,
        message: Some(message.to_string()),
        execution_status: Some("protocolado".to_string()),
        ..Default::default()
    }
}

pub(crate) fn failed_response(message: &str) -> AgentResponse {
    AgentResponse {
        ok: false,
        message: Some(message.to_string()),
        ..Default::default()
    }
}

/// Gateway that replays canned responses and records every call.
#[derive(Default)]
pub(crate) struct ScriptedGateway {
    responses: RefCell<VecDeque<AgentResponse>>,
    calls: RefCell<Vec<(Tribunal, ExecutionPayload, Duration)>>,
}

impl ScriptedGateway {
    pub(crate) fn new(responses: Vec<AgentResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(Tribunal, ExecutionPayload, Duration)> {
        self.calls.borrow().clone()
    }
}

impl AgentGateway for ScriptedGateway {
    fn invoke(
        &self,
        tribunal: Tribunal,
        payload: &ExecutionPayload,
        timeout: Duration,
    ) -> AgentResponse {
        self.calls
            .borrow_mut()
            .push((tribunal, payload.clone(), timeout));
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| failed_response("no scripted response left"))
    }
}

#[derive(Default)]
pub(crate) struct RecordingPause {
    pauses: RefCell<Vec<Duration>>,
}

impl RecordingPause {
    pub(crate) fn pauses(&self) -> Vec<Duration> {
        self.pauses.borrow().clone()
    }
}

impl Pause for RecordingPause {
    fn pause(&self, duration: Duration) {
        self.pauses.borrow_mut().push(duration);
    }
}

#[derive(Default)]
pub(crate) struct MemoryAudit {
    events: RefCell<Vec<Event>>,
}

impl MemoryAudit {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub(crate) fn actions(&self) -> Vec<EventAction> {
        self.events.borrow().iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, event: &Event) -> Result<()> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}

pub(crate) struct FailingAudit;

impl AuditSink for FailingAudit {
    fn record(&self, _event: &Event) -> Result<()> {
        Err(FilingError::UserError("audit log unavailable".to_string()))
    }
}

pub(crate) struct StaticCredentials(pub(crate) Option<Credentials>);

impl CredentialStore for StaticCredentials {
    fn credentials(&self) -> Result<Credentials> {
        self.0.clone().ok_or_else(|| {
            FilingError::Credentials("A1 certificate not configured".to_string())
        })
    }
}

/// Accepts [`VALID_TOKEN`] only.
pub(crate) struct StaticSessions;

impl SessionValidator for StaticSessions {
    fn validate(&self, token: &str) -> Option<Session> {
        (token == VALID_TOKEN).then(|| Session {
            operator: OPERATOR.to_string(),
        })
    }
}

/// Notifier that delivers nothing and remembers who it was asked to notify.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    calls: RefCell<Vec<(Vec<Recipient>, String)>>,
}

impl RecordingNotifier {
    pub(crate) fn calls(&self) -> Vec<(Vec<Recipient>, String)> {
        self.calls.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, recipients: &[Recipient], result: &SubmissionResult) -> NotificationReport {
        self.calls
            .borrow_mut()
            .push((recipients.to_vec(), result.protocol.clone()));
        NotificationReport {
            delivered: Vec::new(),
            skipped: recipients.len(),
        }
    }
}

/// Extractor backed by a file-name lookup table.
#[derive(Default)]
pub(crate) struct TableExtractor(pub(crate) BTreeMap<String, String>);

impl CaseNumberExtractor for TableExtractor {
    fn extract_case_number(&self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.0.get(&name).cloned().ok_or_else(|| {
            FilingError::Extraction(format!("no CNJ case number found in {}", name))
        })
    }
}

/// Fakes for every orchestrator collaborator.
pub(crate) struct Harness {
    pub(crate) gateway: ScriptedGateway,
    pub(crate) credentials: StaticCredentials,
    pub(crate) audit: MemoryAudit,
    pub(crate) notifier: RecordingNotifier,
    pub(crate) pause: RecordingPause,
}

impl Harness {
    pub(crate) fn new(responses: Vec<AgentResponse>) -> Self {
        Self {
            gateway: ScriptedGateway::new(responses),
            credentials: StaticCredentials(Some(sample_credentials())),
            audit: MemoryAudit::default(),
            notifier: RecordingNotifier::default(),
            pause: RecordingPause::default(),
        }
    }

    pub(crate) fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            gateway: &self.gateway,
            credentials: &self.credentials,
            sessions: &StaticSessions,
            audit: &self.audit,
            notifier: &self.notifier,
            pause: &self.pause,
        }
    }
}
