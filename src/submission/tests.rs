//! Tests for the submission orchestrator.

use super::*;
use crate::agent::{AgentResponse, ResponseOrigin, Tribunal};
use crate::config::{Config, Knob};
use crate::error::FilingError;
use crate::events::EventAction;
use crate::flow::Channel;
use crate::notify::Recipient;
use crate::test_support::{
    FailingAudit, Harness, OPERATOR, StaticCredentials, VALID_TOKEN, failed_response, ok_response,
};
use std::time::Duration;

fn request(tribunal: &str, mode: &str) -> SubmissionRequest {
    SubmissionRequest {
        tribunal: tribunal.to_string(),
        case_number: " 1001234-56.2024.8.26.0100 ".to_string(),
        file: "/tmp/peticao.pdf".to_string(),
        description: "Manifestacao".to_string(),
        mode: mode.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_retries_until_success() {
    let harness = Harness::new(vec![
        failed_response("Timeout aguardando portal"),
        failed_response("Erro de rede"),
        ok_response("Peticao protocolada"),
    ]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let result = orchestrator
        .submit(VALID_TOKEN, &request("tjsp", "real"))
        .unwrap();

    assert!(result.ok);
    assert_eq!(result.status, SubmissionStatus::Success);
    assert_eq!(result.attempts_executed, 3);
    assert_eq!(result.final_attempt, 3);
    let outcomes: Vec<bool> = result.attempts.iter().map(|a| a.ok).collect();
    assert_eq!(outcomes, vec![false, false, true]);
    let numbers: Vec<u32> = result.attempts.iter().map(|a| a.attempt).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(
        result.attempts[2].execution_status.as_deref(),
        Some("protocolado")
    );

    assert_eq!(
        harness.pause.pauses(),
        vec![Duration::from_millis(2_500), Duration::from_millis(5_000)]
    );
}

#[test]
fn test_protocol_is_stable_across_attempts() {
    let harness = Harness::new(vec![failed_response("Erro de rede"), ok_response("ok")]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let result = orchestrator
        .submit(VALID_TOKEN, &request("tjsp", "real"))
        .unwrap();

    let calls = harness.gateway.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, p, _)| p.protocol == result.protocol));
    assert_eq!(calls[0].1, calls[1].1);
    assert!(result.protocol.starts_with("TJSP-"));
}

#[test]
fn test_terminal_failure_stops_after_first_attempt() {
    let harness = Harness::new(vec![
        failed_response("Certificado A1 nao informado no payload."),
        ok_response("never reached"),
    ]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let result = orchestrator
        .submit(VALID_TOKEN, &request("trf3", "real"))
        .unwrap();

    assert!(!result.ok);
    assert_eq!(result.status, SubmissionStatus::Failure);
    assert_eq!(result.attempts_executed, 1);
    assert!(harness.pause.pauses().is_empty());
}

#[test]
fn test_launch_failure_is_not_retried() {
    let launch_failure = AgentResponse {
        ok: false,
        simulated: true,
        message: Some("Could not run the agent.".to_string()),
        original_error: Some("No such file or directory".to_string()),
        origin: ResponseOrigin::LaunchFailure,
        ..Default::default()
    };
    let harness = Harness::new(vec![launch_failure]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let result = orchestrator
        .submit(VALID_TOKEN, &request("trt2", "real"))
        .unwrap();

    assert_eq!(result.status, SubmissionStatus::Failure);
    assert_eq!(result.attempts_executed, 1);
    assert_eq!(harness.gateway.calls().len(), 1);
}

#[test]
fn test_exhausted_attempts() {
    let harness = Harness::new(vec![
        failed_response("Erro 1"),
        failed_response("Erro 2"),
        failed_response("Erro 3"),
    ]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let result = orchestrator
        .submit(VALID_TOKEN, &request("trf3", "real"))
        .unwrap();

    assert_eq!(result.status, SubmissionStatus::Failure);
    assert_eq!(result.attempts_executed, 3);
    assert_eq!(result.response.message.as_deref(), Some("Erro 3"));
    assert_eq!(harness.pause.pauses().len(), 2);
}

#[test]
fn test_simulated_mode_makes_one_short_attempt() {
    let harness = Harness::new(vec![failed_response("Erro de rede")]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let result = orchestrator
        .submit(VALID_TOKEN, &request("trf3", ""))
        .unwrap();

    assert_eq!(result.mode, ExecutionMode::Simulated);
    assert_eq!(result.attempts_executed, 1);
    let calls = harness.gateway.calls();
    assert_eq!(calls[0].2, Duration::from_millis(45_000));
    assert_eq!(calls[0].1.mode, ExecutionMode::Simulated);
}

#[test]
fn test_configured_overrides_apply() {
    let mut config = Config::default();
    config.retry.max_attempts = Some(Knob::Int(2));
    config.retry.initial_delay_ms = Some(Knob::Int(0));
    config.terminal_phrases = vec!["Captcha".to_string()];

    let harness = Harness::new(vec![
        failed_response("Erro de rede"),
        failed_response("Erro de rede"),
    ]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &config);
    let result = orchestrator
        .submit(VALID_TOKEN, &request("trf3", "real"))
        .unwrap();
    assert_eq!(result.attempts_executed, 2);
    assert!(harness.pause.pauses().is_empty());

    let harness = Harness::new(vec![failed_response("captcha exibido na pagina")]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &config);
    let result = orchestrator
        .submit(VALID_TOKEN, &request("trf3", "real"))
        .unwrap();
    assert_eq!(result.attempts_executed, 1);
}

#[test]
fn test_tjsp_payload_carries_resolved_flow() {
    let harness = Harness::new(vec![ok_response("ok")]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());
    let mut req = request("TJSP", "");
    req.channel = "esaj".to_string();
    req.access_link = "esaj.tjsp.jus.br/petpg/peticoes/inicial/275858?instancia=pg".to_string();

    let result = orchestrator.submit(VALID_TOKEN, &req).unwrap();

    assert_eq!(result.tribunal, Tribunal::Tjsp);
    assert_eq!(result.tribunal_label, "TJSP");
    assert_eq!(result.channel, Some(Channel::Esaj));
    let flow = result.flow.as_ref().unwrap();
    assert_eq!(flow.module.as_deref(), Some("petpg"));
    assert_eq!(flow.instance.as_deref(), Some("PG"));

    let calls = harness.gateway.calls();
    let (_, payload, _) = &calls[0];
    let target = payload.flow.as_ref().unwrap();
    assert_eq!(
        target.service_url,
        "https://esaj.tjsp.jus.br/petpg/j_spring_cas_security_check"
    );
    assert_eq!(payload.access_link.as_deref(), Some(target.entry_url.as_str()));
    assert_eq!(payload.case_number, "1001234-56.2024.8.26.0100");
    assert_eq!(payload.operator, OPERATOR);
    assert_eq!(payload.credentials.secret, "segredo");
}

#[test]
fn test_other_tribunals_skip_flow_resolution() {
    let harness = Harness::new(vec![ok_response("ok")]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());
    let mut req = request("trt2", "");
    req.channel = "not-a-channel".to_string();

    let result = orchestrator.submit(VALID_TOKEN, &req).unwrap();

    assert!(result.channel.is_none());
    assert!(result.flow.is_none());
    assert!(harness.gateway.calls()[0].1.flow.is_none());
}

fn error_kind(err: &FilingError) -> &'static str {
    match err {
        FilingError::Validation(_) => "validation",
        FilingError::ChannelMismatch { .. } => "channel_mismatch",
        FilingError::InvalidChannel(_) => "invalid_channel",
        _ => "other",
    }
}

#[test]
fn test_pre_attempt_errors_make_no_attempts() {
    let cases = vec![
        (request("tjmg", ""), "validation"),
        (
            SubmissionRequest {
                case_number: "  ".to_string(),
                ..request("tjsp", "")
            },
            "validation",
        ),
        (
            SubmissionRequest {
                file: String::new(),
                ..request("tjsp", "")
            },
            "validation",
        ),
        (request("tjsp", "turbo"), "validation"),
        (
            SubmissionRequest {
                channel: "eproc".to_string(),
                access_link: "https://esaj.tjsp.jus.br/petpg/".to_string(),
                ..request("tjsp", "")
            },
            "channel_mismatch",
        ),
        (
            SubmissionRequest {
                channel: "pje".to_string(),
                ..request("tjsp2", "")
            },
            "invalid_channel",
        ),
    ];

    for (req, expected) in cases {
        let harness = Harness::new(vec![ok_response("ok")]);
        let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());
        let err = orchestrator.submit(VALID_TOKEN, &req).unwrap_err();
        assert_eq!(error_kind(&err), expected, "{:?} for {:?}", err, req);
        assert!(harness.gateway.calls().is_empty());
        assert!(harness.audit.events().is_empty());
    }
}

#[test]
fn test_invalid_session_is_unauthorized() {
    let harness = Harness::new(vec![ok_response("ok")]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let err = orchestrator
        .submit("expired", &request("tjsp", ""))
        .unwrap_err();

    assert!(matches!(err, FilingError::Unauthorized));
    assert!(harness.gateway.calls().is_empty());
}

#[test]
fn test_missing_credentials_abort() {
    let mut harness = Harness::new(vec![ok_response("ok")]);
    harness.credentials = StaticCredentials(None);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let err = orchestrator
        .submit(VALID_TOKEN, &request("trf3", ""))
        .unwrap_err();

    assert!(matches!(err, FilingError::Credentials(_)));
    assert!(harness.gateway.calls().is_empty());
}

#[test]
fn test_lifecycle_events() {
    let harness = Harness::new(vec![failed_response("Erro de rede"), ok_response("ok")]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let result = orchestrator
        .submit(VALID_TOKEN, &request("trf3", "real"))
        .unwrap();

    assert_eq!(
        harness.audit.actions(),
        vec![
            EventAction::SubmissionStarted,
            EventAction::AttemptStarted,
            EventAction::AttemptRetry,
            EventAction::AttemptStarted,
            EventAction::SubmissionSucceeded,
        ]
    );
    let events = harness.audit.events();
    assert!(events.iter().all(|e| e.actor == OPERATOR));
    assert!(
        events
            .iter()
            .all(|e| e.protocol.as_deref() == Some(result.protocol.as_str()))
    );
    assert_eq!(events[0].details["certificado"], "certificate_a1.pfx");
    assert_eq!(events[2].details["delayMs"], 2_500);
    assert_eq!(events[2].details["proximaTentativa"], 2);
    assert_eq!(events[4].details["tentativasExecutadas"], 2);
}

#[test]
fn test_audit_failures_do_not_change_outcome() {
    let harness = Harness::new(vec![failed_response("Erro de rede"), ok_response("ok")]);
    let collaborators = Collaborators {
        audit: &FailingAudit,
        ..harness.collaborators()
    };
    let orchestrator = Orchestrator::new(collaborators, &Config::default());

    let result = orchestrator
        .submit(VALID_TOKEN, &request("trf3", "real"))
        .unwrap();

    assert!(result.ok);
    assert_eq!(result.attempts_executed, 2);
}

#[test]
fn test_notifies_recipients_with_final_result() {
    let harness = Harness::new(vec![ok_response("ok")]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());
    let mut req = request("trf3", "");
    req.recipients = vec![Recipient::Address("@escritorio".to_string())];

    let result = orchestrator.submit(VALID_TOKEN, &req).unwrap();

    let calls = harness.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, req.recipients);
    assert_eq!(calls[0].1, result.protocol);
    assert_eq!(result.notifications.skipped, 1);
}

#[test]
fn test_result_wire_keys() {
    let harness = Harness::new(vec![ok_response("Peticao protocolada")]);
    let orchestrator = Orchestrator::new(harness.collaborators(), &Config::default());

    let result = orchestrator
        .submit(VALID_TOKEN, &request("tjsp2", ""))
        .unwrap();
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["status"], "sucesso");
    assert_eq!(value["tribunalLabel"], "TJSP 2 Grau");
    assert_eq!(value["canalPeticionamento"], "eproc");
    assert_eq!(value["tentativasExecutadas"], 1);
    assert_eq!(value["historicoTentativas"][0]["tentativa"], 1);
    assert_eq!(value["respostaRobo"]["mensagem"], "Peticao protocolada");
    assert_eq!(value["notificacoes"]["ignoradas"], 0);
}

#[test]
fn test_request_from_batch_yaml() {
    let yaml = r#"
tribunal: tjsp
numeroProcesso: 1001234-56.2024.8.26.0100
arquivo: /tmp/peticao.pdf
canalPeticionamento: eproc
destinatarios:
  - "@escritorio"
"#;
    let req: SubmissionRequest = serde_yaml::from_str(yaml).unwrap();
    assert!(req.confirm_protocol);
    assert_eq!(req.channel, "eproc");
    assert_eq!(req.recipients.len(), 1);

    let fields = req.validate().unwrap();
    assert_eq!(fields.tribunal, Tribunal::Tjsp);
    assert_eq!(fields.mode, ExecutionMode::Simulated);
}
