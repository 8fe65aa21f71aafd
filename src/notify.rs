//! Result notifications.
//!
//! Each submission may name recipients that should hear about its outcome.
//! Delivery is best-effort: a recipient that cannot be routed or delivered to
//! is counted as skipped and the submission result is unaffected.

use crate::agent::truncate_chars;
use crate::events::{AuditSink, Event, EventAction};
use crate::submission::SubmissionResult;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Characters of the message kept in the audit preview.
const PREVIEW_CHARS: usize = 140;

/// A notification target.
///
/// Written either as a bare address (`@handle` routes to Telegram, anything
/// else to e-mail) or as an explicit `{canal, destino}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipient {
    Address(String),
    Routed {
        #[serde(rename = "canal", alias = "channel", default)]
        channel: Option<String>,
        #[serde(rename = "destino", alias = "destination", default)]
        destination: Option<String>,
    },
}

impl Recipient {
    /// Channel and destination, or `None` if either part is missing.
    pub fn route(&self) -> Option<(String, String)> {
        let (channel, destination) = match self {
            Recipient::Address(address) => {
                let address = address.trim();
                let channel = if address.starts_with('@') {
                    "telegram"
                } else {
                    "email"
                };
                (channel.to_string(), address.to_string())
            }
            Recipient::Routed {
                channel,
                destination,
            } => (
                channel.as_deref().unwrap_or("").trim().to_lowercase(),
                destination.as_deref().unwrap_or("").trim().to_string(),
            ),
        };

        (!channel.is_empty() && !destination.is_empty()).then_some((channel, destination))
    }
}

/// One delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    #[serde(rename = "canal")]
    pub channel: String,
    #[serde(rename = "destino")]
    pub destination: String,
    pub ticket: String,
    #[serde(rename = "enviadoEm")]
    pub sent_at: DateTime<Utc>,
}

/// Outcome of notifying every recipient of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
    #[serde(rename = "enviadas")]
    pub delivered: Vec<Delivery>,
    #[serde(rename = "ignoradas")]
    pub skipped: usize,
}

/// Delivers result notifications.
pub trait Notifier {
    fn notify(&self, recipients: &[Recipient], result: &SubmissionResult) -> NotificationReport;
}

/// Text sent for a finished submission.
pub fn result_message(result: &SubmissionResult) -> String {
    format!(
        "Resultado do protocolo {}: {}",
        result.protocol,
        result.status.as_str()
    )
}

/// Notifier that hands messages to the audit trail.
///
/// Outbound transports pick notifications up from the `notificacao_enviada`
/// events; a failed audit write means the message was not handed off and the
/// recipient counts as skipped.
pub struct AuditNotifier<'a> {
    audit: &'a dyn AuditSink,
}

impl<'a> AuditNotifier<'a> {
    pub fn new(audit: &'a dyn AuditSink) -> Self {
        Self { audit }
    }
}

impl Notifier for AuditNotifier<'_> {
    fn notify(&self, recipients: &[Recipient], result: &SubmissionResult) -> NotificationReport {
        let mut report = NotificationReport::default();
        let message = result_message(result);

        for recipient in recipients {
            let Some((channel, destination)) = recipient.route() else {
                report.skipped += 1;
                continue;
            };

            let ticket = new_ticket();
            let event = Event::new(EventAction::NotificationSent)
                .with_actor("system")
                .with_protocol(result.protocol.clone())
                .with_details(json!({
                    "canal": channel,
                    "destino": destination,
                    "ticket": ticket,
                    "preview": truncate_chars(&message, PREVIEW_CHARS),
                }));

            match self.audit.record(&event) {
                Ok(()) => report.delivered.push(Delivery {
                    channel,
                    destination,
                    ticket,
                    sent_at: Utc::now(),
                }),
                Err(e) => {
                    tracing::warn!(protocol = %result.protocol, error = %e, "notification not delivered");
                    report.skipped += 1;
                }
            }
        }

        report
    }
}

fn new_ticket() -> String {
    let mut suffix = [0u8; 2];
    rand::thread_rng().fill_bytes(&mut suffix);
    format!(
        "ntf_{}{:02x}{:02x}",
        to_base36(Utc::now().timestamp_millis().unsigned_abs()),
        suffix[0],
        suffix[1]
    )
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
