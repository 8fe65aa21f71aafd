//! eproc (Keycloak SSO) flow resolution.

use super::link::{decode_repeated, host_lower, origin, query_param, strip_volatile_params};
use super::{Channel, EPROC_SSO_HOST, FlowKind, FlowMetadata, FlowResolution, infer_channel};
use crate::error::{FilingError, Result};
use url::Url;

/// Public entry page used when no usable link was supplied.
pub const DEFAULT_ENTRY_URL: &str = "https://eproc-consulta.tjsp.jus.br/consulta_1g/externo_controlador.php?acao=tjsp@consulta_unificada_publica/consultar";

/// Service URL used when none can be derived from the link.
pub const DEFAULT_SERVICE_URL: &str = "https://eproc.tjsp.jus.br/eproc/";

const DEFAULT_HOST: &str = "eproc.tjsp.jus.br";

const SSO_AUTH_PATH: &str = "/realms/eproc/protocol/openid-connect/auth";

pub(super) fn resolve(link: Option<&Url>) -> Result<FlowResolution> {
    if let Some(link) = link
        && infer_channel(link) == Some(Channel::Esaj)
    {
        return Err(FilingError::ChannelMismatch {
            hint: Channel::Eproc.to_string(),
            inferred: Channel::Esaj.to_string(),
        });
    }

    let Some(link) = link else {
        return Ok(build(
            DEFAULT_ENTRY_URL.to_string(),
            String::new(),
            DEFAULT_SERVICE_URL.to_string(),
            String::new(),
            default_metadata(),
        ));
    };

    let cleaned = strip_volatile_params(link);
    let entry_url = cleaned.to_string();
    let host = host_lower(&cleaned);

    if is_sso_login(&cleaned) {
        let redirect = query_param(&cleaned, "redirect_uri")
            .map(|raw| decode_repeated(&raw).trim().to_string())
            .and_then(|raw| Url::parse(&raw).ok());
        let service_url = redirect
            .as_ref()
            .map(|r| format!("{}/eproc/", origin(r)))
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
        let redirect_host = redirect
            .as_ref()
            .map(host_lower)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| host.clone());

        let metadata = metadata(FlowKind::Sso, EPROC_SSO_HOST.to_string(), redirect_host);
        return Ok(build(
            entry_url.clone(),
            entry_url.clone(),
            service_url,
            entry_url,
            metadata,
        ));
    }

    if host.contains("eproc") {
        let service_url = format!("{}/eproc/", origin(&cleaned));
        let metadata = metadata(FlowKind::Direto, host.clone(), host);
        return Ok(build(
            entry_url.clone(),
            entry_url,
            service_url,
            String::new(),
            metadata,
        ));
    }

    Ok(build(
        entry_url.clone(),
        entry_url,
        DEFAULT_SERVICE_URL.to_string(),
        String::new(),
        default_metadata(),
    ))
}

fn is_sso_login(url: &Url) -> bool {
    host_lower(url) == EPROC_SSO_HOST && url.path().to_ascii_lowercase().starts_with(SSO_AUTH_PATH)
}

fn metadata(kind: FlowKind, origin: String, host: String) -> FlowMetadata {
    FlowMetadata {
        family: Channel::Eproc,
        kind,
        module: None,
        instance: None,
        service_code: None,
        origin: Some(origin),
        host: Some(host),
    }
}

fn default_metadata() -> FlowMetadata {
    metadata(FlowKind::Portal, "padrao".to_string(), DEFAULT_HOST.to_string())
}

fn build(
    entry_url: String,
    original_link: String,
    service_url: String,
    login_url: String,
    flow: FlowMetadata,
) -> FlowResolution {
    FlowResolution {
        channel: Channel::Eproc,
        access_link: entry_url.clone(),
        entry_url,
        portal_url: String::new(),
        service_url,
        login_url,
        original_link,
        flow,
    }
}
