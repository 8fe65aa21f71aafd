//! e-SAJ (CAS) flow resolution.

use super::link::{decode_repeated, has_http_scheme, query_param, strip_volatile_params};
use super::{Channel, FlowKind, FlowMetadata, FlowResolution};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Fixed e-SAJ origin; every CAS endpoint lives here.
pub const ESAJ_ORIGIN: &str = "https://esaj.tjsp.jus.br";

/// Service code used when the link does not name one.
pub const DEFAULT_SERVICE_CODE: &str = "190090";

/// Maximum nesting depth followed when unwrapping `servico`/`service` links.
pub const MAX_UNWRAP_ROUNDS: usize = 4;

const CAS_LOGIN_PATH: &str = "/sajcas/login";

static FILING_MODULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^/(petpg|petsg|petcr)(?:/|$)").expect("Invalid filing module regex")
});

static PETITION_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/peticoes/(inicial|intermediaria)(?:/|$)").expect("Invalid petition type regex")
});

static SERVICE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)(?:/api/auth/check)?$").expect("Invalid service code regex")
});

pub(super) fn resolve(link: Option<&Url>) -> FlowResolution {
    let mut service_code = DEFAULT_SERVICE_CODE.to_string();
    let mut original_link = String::new();

    if let Some(link) = link {
        let cleaned = strip_volatile_params(link);
        original_link = cleaned.to_string();
        if let Some(module) = filing_module_from_link(&cleaned) {
            return filing_flow(&cleaned, &module);
        }
        if let Some(code) = service_code_from_link(&cleaned) {
            service_code = code;
        }
    }

    service_flow(&service_code, original_link)
}

/// Direct filing flow for a `petpg`/`petsg`/`petcr` module link.
fn filing_flow(cleaned: &Url, module: &str) -> FlowResolution {
    let kind = petition_kind(cleaned.path());
    let instance = query_param(cleaned, "instancia")
        .map(|value| value.trim().to_uppercase())
        .unwrap_or_default();
    let service_url = format!("{}/{}/j_spring_cas_security_check", ESAJ_ORIGIN, module);
    let login_url = cas_login_url(&service_url);

    let portal_url = if cleaned.path().eq_ignore_ascii_case(CAS_LOGIN_PATH) {
        format!("{}/{}/", ESAJ_ORIGIN, module)
    } else {
        cleaned.to_string()
    };

    FlowResolution {
        channel: Channel::Esaj,
        entry_url: login_url.clone(),
        portal_url,
        service_url,
        login_url: login_url.clone(),
        access_link: login_url,
        original_link: cleaned.to_string(),
        flow: FlowMetadata {
            family: Channel::Esaj,
            kind,
            module: Some(module.to_string()),
            instance: Some(instance),
            service_code: None,
            origin: None,
            host: None,
        },
    }
}

/// Numeric service flow, the e-SAJ fallback.
fn service_flow(service_code: &str, original_link: String) -> FlowResolution {
    let encoded = urlencoding::encode(service_code);
    let portal_url = format!("{}/esaj/?servico={}", ESAJ_ORIGIN, encoded);
    let service_url = format!("{}/esaj/api/auth/check?servico={}", ESAJ_ORIGIN, encoded);
    let login_url = cas_login_url(&service_url);

    FlowResolution {
        channel: Channel::Esaj,
        entry_url: login_url.clone(),
        portal_url,
        service_url,
        login_url: login_url.clone(),
        access_link: login_url,
        original_link,
        flow: FlowMetadata {
            family: Channel::Esaj,
            kind: FlowKind::Consulta,
            module: Some("esaj".to_string()),
            instance: None,
            service_code: Some(service_code.to_string()),
            origin: None,
            host: None,
        },
    }
}

fn cas_login_url(service_url: &str) -> String {
    format!(
        "{}{}?service={}",
        ESAJ_ORIGIN,
        CAS_LOGIN_PATH,
        urlencoding::encode(service_url)
    )
}

fn filing_module(path: &str) -> Option<String> {
    FILING_MODULE_RE
        .captures(path)
        .map(|caps| caps[1].to_ascii_lowercase())
}

fn petition_kind(path: &str) -> FlowKind {
    match PETITION_TYPE_RE
        .captures(path)
        .map(|caps| caps[1].to_ascii_lowercase())
        .as_deref()
    {
        Some("inicial") => FlowKind::Inicial,
        Some("intermediaria") => FlowKind::Intermediaria,
        _ => FlowKind::Peticionamento,
    }
}

/// Filing module from the link path, or from the URL carried in `service`.
fn filing_module_from_link(url: &Url) -> Option<String> {
    if let Some(module) = filing_module(url.path()) {
        return Some(module);
    }

    let service = decode_repeated(&query_param(url, "service")?);
    if has_http_scheme(&service) {
        return Url::parse(service.trim())
            .ok()
            .and_then(|nested| filing_module(nested.path()));
    }
    filing_module(&service)
}

/// What a `servico`/`service` value carries once decoded.
enum ServiceValue {
    Code(String),
    Nested(Url),
    Nothing,
}

fn classify_service_value(raw: &str, accept_any_url: bool) -> ServiceValue {
    let text = decode_repeated(raw);
    let text = text.trim();
    if text.is_empty() {
        return ServiceValue::Nothing;
    }
    if let Some(caps) = SERVICE_CODE_RE.captures(text) {
        return ServiceValue::Code(caps[1].to_string());
    }
    if accept_any_url || has_http_scheme(text) {
        if let Ok(nested) = Url::parse(text) {
            return ServiceValue::Nested(nested);
        }
    }
    ServiceValue::Nothing
}

/// Extract a numeric service code, unwrapping nested links a bounded number of times.
///
/// `servico` is searched first, following a nested URL all the way down; only
/// when that path yields no code is `service` consulted.
fn service_code_from_link(link: &Url) -> Option<String> {
    service_code_within(link, MAX_UNWRAP_ROUNDS)
}

/// Depth-first lookup; `depth` counts the links that may still be inspected.
fn service_code_within(link: &Url, depth: usize) -> Option<String> {
    if depth == 0 {
        return None;
    }

    let from_param = |name: &str, accept_any_url: bool| {
        match query_param(link, name).map(|v| classify_service_value(&v, accept_any_url))? {
            ServiceValue::Code(code) => Some(code),
            ServiceValue::Nested(next) => service_code_within(&next, depth - 1),
            ServiceValue::Nothing => None,
        }
    };

    from_param("servico", false).or_else(|| from_param("service", true))
}
