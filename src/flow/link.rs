//! Defensive URL handling shared by the channel resolvers.
//!
//! Portal links are pasted by operators straight from a browser, so they show
//! up without a scheme, percent-encoded several times, or carrying single-use
//! CAS tokens. Everything here is pure and never panics on odd input.

use crate::error::{FilingError, Result};
use std::borrow::Cow;
use url::Url;

/// Maximum number of percent-decoding rounds applied to a value.
pub const MAX_DECODE_ROUNDS: usize = 4;

/// Query parameters that carry single-use CAS tokens and must never be replayed.
pub const VOLATILE_PARAMS: [&str; 2] = ["ticket", "origemServidor"];

/// Percent-decode a value repeatedly until it stops changing.
///
/// Decoding stops early (keeping the last good value) when a round would hit a
/// malformed escape or produce invalid UTF-8.
pub fn decode_repeated(value: &str) -> String {
    let mut current = value.to_string();
    for _ in 0..MAX_DECODE_ROUNDS {
        let Some(decoded) = decode_round(&current) else {
            break;
        };
        if decoded == current {
            break;
        }
        current = decoded;
    }
    current
}

/// One strict decoding round; `None` when the input is malformed.
fn decode_round(value: &str) -> Option<String> {
    if has_malformed_escape(value) {
        return None;
    }
    match urlencoding::decode(value) {
        Ok(Cow::Borrowed(s)) => Some(s.to_string()),
        Ok(Cow::Owned(s)) => Some(s),
        Err(_) => None,
    }
}

fn has_malformed_escape(value: &str) -> bool {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return true;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    false
}

/// Whether a value starts with an `http://` or `https://` scheme.
pub fn has_http_scheme(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Parse an operator-supplied access link.
///
/// Returns `Ok(None)` for an empty value. The direct form (with `https://`
/// prepended when no scheme is present) is tried first, then its repeatedly
/// decoded form.
pub fn parse_link(raw: &str) -> Result<Option<Url>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let direct = if has_http_scheme(raw) {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let decoded = decode_repeated(&direct);

    for candidate in [direct.as_str(), decoded.as_str()] {
        if let Ok(url) = Url::parse(candidate) {
            return Ok(Some(url));
        }
    }

    Err(FilingError::UnresolvableLink(raw.to_string()))
}

/// First value of a query parameter, form-decoded.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Copy of `url` without the volatile CAS parameters.
///
/// The query is re-serialized in form-urlencoded style; an empty query is
/// dropped entirely.
pub fn strip_volatile_params(url: &Url) -> Url {
    let mut cleaned = url.clone();
    if url.query().is_none() {
        return cleaned;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !VOLATILE_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

/// Lower-cased host of a URL, empty when the URL has none.
pub fn host_lower(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_ascii_lowercase()
}

/// Serialized origin, e.g. `https://eproc1g.tjsp.jus.br`.
pub fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}
