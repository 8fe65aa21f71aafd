//! Operator session validation.

use crate::config::Config;
use serde::Serialize;
use std::collections::BTreeMap;

/// An authenticated operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Operator e-mail, recorded in payloads and audit events.
    pub operator: String,
}

/// Resolves a session token to a session.
///
/// `None` means the token is unknown or expired; callers turn it into
/// `FilingError::Unauthorized`.
pub trait SessionValidator {
    fn validate(&self, token: &str) -> Option<Session>;
}

/// Sessions declared in `config.yaml` under `sessions`.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredSessions {
    tokens: BTreeMap<String, String>,
}

impl ConfiguredSessions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tokens: config.sessions.clone(),
        }
    }
}

impl SessionValidator for ConfiguredSessions {
    fn validate(&self, token: &str) -> Option<Session> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        self.tokens.get(token).map(|operator| Session {
            operator: operator.trim().to_string(),
        })
    }
}
