//! Retry policy for agent attempts.
//!
//! A policy is derived from the execution mode and the operator's retry
//! settings once per submission. Classification decides whether a failed
//! attempt is worth repeating: some failures (missing certificate, missing
//! file, a page element that does not exist) will fail identically on every
//! attempt, so retrying them only burns time on the portal.

use crate::agent::{AgentResponse, ResponseOrigin};
use crate::config::{RetrySettings, clamp_float, clamp_int};
use crate::submission::ExecutionMode;
use serde::Serialize;
use std::time::Duration;

/// Per-attempt timeout in real mode (8 minutes).
pub const REAL_TIMEOUT_MS: u64 = 480_000;
/// Per-attempt timeout in simulated mode.
pub const SIMULATED_TIMEOUT_MS: u64 = 45_000;
/// Attempts in real mode.
pub const REAL_MAX_ATTEMPTS: u64 = 3;
/// Attempts in simulated mode.
pub const SIMULATED_MAX_ATTEMPTS: u64 = 1;
/// Wait before the second attempt.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 2_500;
/// Growth factor for consecutive waits.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
/// Upper bound for a single wait.
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;

const TIMEOUT_RANGE: (u64, u64) = (5_000, 3_600_000);
const ATTEMPTS_RANGE: (u64, u64) = (1, 8);
const INITIAL_DELAY_RANGE: (u64, u64) = (0, 120_000);
const BACKOFF_RANGE: (f64, f64) = (1.0, 6.0);
const MAX_DELAY_RANGE: (u64, u64) = (1_000, 300_000);

/// Agent failure messages that will not change on retry.
///
/// Matched case-insensitively as substrings of the agent's message. The agent
/// scripts report in Portuguese, so the phrases are kept verbatim.
pub const TERMINAL_PHRASES: [&str; 9] = [
    "canal tjsp invalido",
    "fluxo e-saj",
    "fluxo eproc sem url",
    "certificado a1 nao informado",
    "arquivo da peticao nao informado",
    "arquivo da peticao nao encontrado",
    "nao foi possivel localizar campo de upload",
    "nao foi possivel localizar botao de protocolo",
    "numero do processo",
];

/// Resolved retry and timeout configuration for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub timeout_ms: u64,
}

impl RetryPolicy {
    /// Resolve the policy for an execution mode.
    ///
    /// Real mode defaults to 3 attempts and an 8 minute timeout; simulated mode
    /// to a single 45 second attempt. Each override is clamped to its range, and
    /// a non-numeric override leaves the default in place.
    pub fn resolve(mode: ExecutionMode, settings: &RetrySettings) -> Self {
        let (attempts, timeout) = match mode {
            ExecutionMode::Real => (REAL_MAX_ATTEMPTS, REAL_TIMEOUT_MS),
            ExecutionMode::Simulated => (SIMULATED_MAX_ATTEMPTS, SIMULATED_TIMEOUT_MS),
        };

        Self {
            max_attempts: clamp_int(
                settings.max_attempts.as_ref(),
                attempts,
                ATTEMPTS_RANGE.0,
                ATTEMPTS_RANGE.1,
            ) as u32,
            initial_delay_ms: clamp_int(
                settings.initial_delay_ms.as_ref(),
                DEFAULT_INITIAL_DELAY_MS,
                INITIAL_DELAY_RANGE.0,
                INITIAL_DELAY_RANGE.1,
            ),
            backoff_factor: clamp_float(
                settings.backoff_factor.as_ref(),
                DEFAULT_BACKOFF_FACTOR,
                BACKOFF_RANGE.0,
                BACKOFF_RANGE.1,
            ),
            max_delay_ms: clamp_int(
                settings.max_delay_ms.as_ref(),
                DEFAULT_MAX_DELAY_MS,
                MAX_DELAY_RANGE.0,
                MAX_DELAY_RANGE.1,
            ),
            timeout_ms: clamp_int(
                settings.timeout_ms.as_ref(),
                timeout,
                TIMEOUT_RANGE.0,
                TIMEOUT_RANGE.1,
            ),
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Waits between consecutive attempts, in order.
    pub fn delays(&self) -> Backoff {
        Backoff {
            next_ms: self.initial_delay_ms,
            factor: self.backoff_factor,
            max_ms: self.max_delay_ms,
        }
    }
}

/// Endless exponential backoff schedule, each wait capped at the maximum.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_ms: u64,
    factor: f64,
    max_ms: u64,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next_ms.min(self.max_ms);
        self.next_ms = ((current as f64 * self.factor).round() as u64).min(self.max_ms);
        Some(Duration::from_millis(current))
    }
}

/// Whether a failed attempt may be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Retryability {
    Retryable,
    Terminal,
}

/// Classifies agent failures using the built-in and configured terminal phrases.
#[derive(Debug, Clone, Default)]
pub struct FailureClassifier {
    extra_phrases: Vec<String>,
}

impl FailureClassifier {
    /// Build a classifier with additional lower-cased terminal phrases.
    pub fn new(extra_phrases: Vec<String>) -> Self {
        Self { extra_phrases }
    }

    /// Classify a response.
    ///
    /// Launch failures are terminal: no runtime could start the agent, and
    /// nothing changes between attempts. Other failures are terminal only when
    /// their message names a known unrecoverable condition.
    pub fn classify(&self, response: &AgentResponse) -> Retryability {
        if response.origin == ResponseOrigin::LaunchFailure {
            return Retryability::Terminal;
        }

        let message = response.failure_text().to_lowercase();
        if message.is_empty() {
            return Retryability::Retryable;
        }

        let terminal = TERMINAL_PHRASES
            .iter()
            .copied()
            .chain(self.extra_phrases.iter().map(String::as_str))
            .any(|phrase| message.contains(phrase));

        if terminal {
            Retryability::Terminal
        } else {
            Retryability::Retryable
        }
    }

    /// Whether the loop should try again after this response.
    ///
    /// Successful responses are never retried.
    pub fn should_retry(&self, response: &AgentResponse) -> bool {
        !response.ok && self.classify(response) == Retryability::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Knob;

    fn failure(message: &str) -> AgentResponse {
        AgentResponse {
            ok: false,
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_real_mode_defaults() {
        let policy = RetryPolicy::resolve(ExecutionMode::Real, &RetrySettings::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.timeout_ms, 480_000);
        assert_eq!(policy.initial_delay_ms, 2_500);
        assert_eq!(policy.backoff_factor, 2.0);
        assert_eq!(policy.max_delay_ms, 60_000);
    }

    #[test]
    fn test_simulated_mode_defaults() {
        let policy = RetryPolicy::resolve(ExecutionMode::Simulated, &RetrySettings::default());
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.timeout_ms, 45_000);
    }

    #[test]
    fn test_overrides_are_clamped() {
        let settings = RetrySettings {
            timeout_ms: Some(Knob::Int(10)),
            max_attempts: Some(Knob::Text("20".to_string())),
            initial_delay_ms: Some(Knob::Int(500_000)),
            backoff_factor: Some(Knob::Float(0.2)),
            max_delay_ms: Some(Knob::Int(999_999)),
        };
        let policy = RetryPolicy::resolve(ExecutionMode::Real, &settings);
        assert_eq!(policy.timeout_ms, 5_000);
        assert_eq!(policy.max_attempts, 8);
        assert_eq!(policy.initial_delay_ms, 120_000);
        assert_eq!(policy.backoff_factor, 1.0);
        assert_eq!(policy.max_delay_ms, 300_000);
    }

    #[test]
    fn test_non_numeric_overrides_fall_back() {
        let settings = RetrySettings {
            timeout_ms: Some(Knob::Text("soon".to_string())),
            max_attempts: Some(Knob::Text("many".to_string())),
            ..Default::default()
        };
        let policy = RetryPolicy::resolve(ExecutionMode::Real, &settings);
        assert_eq!(policy.timeout_ms, 480_000);
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay_ms: 2_500,
            backoff_factor: 2.0,
            max_delay_ms: 8_000,
            timeout_ms: 5_000,
        };
        let delays: Vec<u64> = policy
            .delays()
            .take(4)
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![2_500, 5_000, 8_000, 8_000]);
    }

    #[test]
    fn test_backoff_first_wait_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_delay_ms: 90_000,
            backoff_factor: 1.5,
            max_delay_ms: 10_000,
            timeout_ms: 5_000,
        };
        assert_eq!(policy.delays().next(), Some(Duration::from_millis(10_000)));
    }

    #[test]
    fn test_terminal_phrases_are_case_insensitive() {
        let classifier = FailureClassifier::default();
        let response = failure("Certificado A1 nao informado no payload.");
        assert_eq!(classifier.classify(&response), Retryability::Terminal);
        assert!(!classifier.should_retry(&response));
    }

    #[test]
    fn test_original_error_is_considered() {
        let classifier = FailureClassifier::default();
        let response = AgentResponse {
            ok: false,
            original_error: Some("Arquivo da peticao nao encontrado: /tmp/x.pdf".to_string()),
            ..Default::default()
        };
        assert_eq!(classifier.classify(&response), Retryability::Terminal);
    }

    #[test]
    fn test_unknown_failure_is_retryable() {
        let classifier = FailureClassifier::default();
        let response = failure("Timeout aguardando pagina de login");
        assert_eq!(classifier.classify(&response), Retryability::Retryable);
        assert!(classifier.should_retry(&response));
    }

    #[test]
    fn test_extra_phrases() {
        let classifier = FailureClassifier::new(vec!["captcha bloqueado".to_string()]);
        let response = failure("Portal retornou CAPTCHA BLOQUEADO");
        assert_eq!(classifier.classify(&response), Retryability::Terminal);
    }

    #[test]
    fn test_success_is_never_retried() {
        let classifier = FailureClassifier::default();
        let response = AgentResponse {
            ok: true,
            message: Some("numero do processo conferido".to_string()),
            ..Default::default()
        };
        assert!(!classifier.should_retry(&response));
    }

    #[test]
    fn test_launch_failure_is_terminal() {
        let classifier = FailureClassifier::default();
        let response = AgentResponse {
            ok: false,
            origin: ResponseOrigin::LaunchFailure,
            ..Default::default()
        };
        assert_eq!(classifier.classify(&response), Retryability::Terminal);
    }
}
