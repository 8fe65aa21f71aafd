//! TJSP flow normalization.
//!
//! The TJSP courts (`tjsp`, `tjsp2`) are reached through two structurally
//! different authentication ecosystems:
//!
//! - **e-SAJ**: CAS login (`sajcas`) in front of numeric services and the
//!   filing modules `petpg`, `petsg` and `petcr`
//! - **eproc**: Keycloak SSO (`/realms/eproc/...`) in front of the eproc hosts
//!
//! [`resolve_flow`] turns an operator's channel hint and pasted access link
//! into one canonical [`FlowResolution`] that the agent can navigate without
//! guessing. The function is pure: same input, same output, no I/O.

mod eproc;
mod esaj;
pub mod link;


use crate::error::{FilingError, Result};
use link::{host_lower, parse_link};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Host fragment identifying e-SAJ links.
const ESAJ_HOST_FRAGMENT: &str = "esaj.tjsp.jus.br";

/// Host fragment identifying the e-SAJ CAS server.
const SAJCAS_HOST_FRAGMENT: &str = "sajcas";

/// Keycloak host serving the eproc realm.
pub const EPROC_SSO_HOST: &str = "sso.tjsp.jus.br";

/// Path prefix of every URL under the eproc realm.
const EPROC_REALM_PREFIX: &str = "/realms/eproc/";

/// Host fragment identifying eproc links.
const EPROC_HOST_FRAGMENT: &str = "eproc";

/// Filing channel (authentication family) for TJSP courts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// CAS-based e-SAJ portal.
    Esaj,
    /// SSO/realm-based eproc portal.
    Eproc,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Esaj => "esaj",
            Channel::Eproc => "eproc",
        }
    }

    /// Parse an operator channel hint.
    ///
    /// Blank input means "no hint". Anything else must name a known channel.
    pub fn parse_hint(hint: &str) -> Result<Option<Channel>> {
        let hint = hint.trim().to_ascii_lowercase();
        match hint.as_str() {
            "" => Ok(None),
            "esaj" => Ok(Some(Channel::Esaj)),
            "eproc" => Ok(Some(Channel::Eproc)),
            _ => Err(FilingError::InvalidChannel(hint)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of navigation flow the agent should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    /// e-SAJ filing module, initial petition.
    Inicial,
    /// e-SAJ filing module, intermediate petition.
    Intermediaria,
    /// e-SAJ filing module, petition type not present in the link.
    Peticionamento,
    /// e-SAJ numeric service reached through CAS.
    Consulta,
    /// eproc Keycloak login.
    Sso,
    /// eproc host linked directly.
    Direto,
    /// eproc default public entry.
    Portal,
}

/// Family-specific flow details attached to a [`FlowResolution`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMetadata {
    #[serde(rename = "familia")]
    pub family: Channel,

    #[serde(rename = "tipo")]
    pub kind: FlowKind,

    /// Filing module (`petpg`, `petsg`, `petcr`) or `esaj` for service flows.
    #[serde(rename = "modulo", default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Court instance code from the `instancia` parameter, upper-cased.
    #[serde(rename = "instancia", default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Numeric e-SAJ service code.
    #[serde(rename = "servico", default, skip_serializing_if = "Option::is_none")]
    pub service_code: Option<String>,

    #[serde(rename = "origem", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Canonical navigation target for one filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowResolution {
    #[serde(rename = "canal")]
    pub channel: Channel,

    #[serde(rename = "entradaUrl")]
    pub entry_url: String,

    #[serde(rename = "portalUrl")]
    pub portal_url: String,

    #[serde(rename = "serviceUrl")]
    pub service_url: String,

    #[serde(rename = "loginUrl")]
    pub login_url: String,

    /// The URL the agent should navigate to first.
    #[serde(rename = "linkAcessoNormalizado")]
    pub access_link: String,

    /// Supplied link without volatile parameters; empty when none was supplied.
    #[serde(rename = "linkOriginalNormalizado")]
    pub original_link: String,

    #[serde(rename = "fluxo")]
    pub flow: FlowMetadata,
}

/// Resolve the canonical TJSP flow for a channel hint and raw access link.
///
/// # Errors
///
/// * `InvalidChannel` - the hint is not blank, `esaj` or `eproc`
/// * `UnresolvableLink` - the link is non-empty but unparseable
/// * `ChannelMismatch` - the hint contradicts the channel implied by the link
pub fn resolve_flow(channel_hint: &str, raw_link: &str) -> Result<FlowResolution> {
    let hinted = Channel::parse_hint(channel_hint)?;
    let link = parse_link(raw_link)?;
    let inferred = link.as_ref().and_then(infer_channel);

    if let (Some(hint), Some(inferred)) = (hinted, inferred)
        && hint != inferred
    {
        return Err(FilingError::ChannelMismatch {
            hint: hint.to_string(),
            inferred: inferred.to_string(),
        });
    }

    match hinted.or(inferred).unwrap_or(Channel::Eproc) {
        Channel::Esaj => Ok(esaj::resolve(link.as_ref())),
        Channel::Eproc => eproc::resolve(link.as_ref()),
    }
}

/// Infer the channel a link belongs to from its host and path.
pub fn infer_channel(url: &Url) -> Option<Channel> {
    let host = host_lower(url);
    let path = url.path().to_ascii_lowercase();

    if host.contains(ESAJ_HOST_FRAGMENT) || host.contains(SAJCAS_HOST_FRAGMENT) {
        return Some(Channel::Esaj);
    }
    if host == EPROC_SSO_HOST && path.starts_with(EPROC_REALM_PREFIX) {
        return Some(Channel::Eproc);
    }
    if host.contains(EPROC_HOST_FRAGMENT) {
        return Some(Channel::Eproc);
    }
    None
}
