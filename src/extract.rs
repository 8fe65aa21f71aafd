//! Case number extraction from filing documents.
//!
//! Brazilian case numbers follow the CNJ layout `NNNNNNN-DD.AAAA.J.TR.OOOO`.
//! Documents carry them either masked or as 20 bare digits. The PDF text is
//! searched first; the file name is the fallback.

use crate::error::{FilingError, Result};
use lopdf::Document;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Masked CNJ number. Bounded by non-digits so `peticao_NNN...` still matches.
static CNJ_MASKED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(\d{7}-\d{2}\.\d{4}\.\d\.\d{2}\.\d{4})(?:\D|$)")
        .expect("Invalid CNJ regex")
});

/// CNJ number without punctuation.
static CNJ_COMPACT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(\d{20})(?:\D|$)").expect("Invalid compact CNJ regex")
});

/// Digits in a CNJ number.
const CNJ_DIGITS: usize = 20;

/// Supplies the case number a document belongs to.
pub trait CaseNumberExtractor {
    fn extract_case_number(&self, path: &Path) -> Result<String>;
}

/// Reads case numbers out of PDF text with `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfCaseNumberExtractor;

impl CaseNumberExtractor for PdfCaseNumberExtractor {
    fn extract_case_number(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(FilingError::Extraction(format!(
                "document not found: {}",
                path.display()
            )));
        }
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(FilingError::Extraction(format!(
                "not a PDF document: {}",
                path.display()
            )));
        }

        let text = match pdf_text(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read PDF text");
                String::new()
            }
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        find_case_number(&text)
            .or_else(|| find_case_number(&file_name))
            .ok_or_else(|| {
                FilingError::Extraction(format!(
                    "no CNJ case number found in {}",
                    path.display()
                ))
            })
    }
}

fn pdf_text(path: &Path) -> std::result::Result<String, lopdf::Error> {
    let document = Document::load(path)?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(String::new());
    }
    document.extract_text(&pages)
}

/// First CNJ number in `text`, normalized to the masked layout.
///
/// Masked numbers take precedence over compact ones.
pub fn find_case_number(text: &str) -> Option<String> {
    CNJ_MASKED_REGEX
        .captures(text)
        .or_else(|| CNJ_COMPACT_REGEX.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| normalize_case_number(m.as_str()))
}

/// Format a CNJ number as `NNNNNNN-DD.AAAA.J.TR.OOOO`.
///
/// Returns `None` unless the input has exactly 20 digits.
pub fn normalize_case_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != CNJ_DIGITS {
        return None;
    }
    Some(format!(
        "{}-{}.{}.{}.{}.{}",
        &digits[0..7],
        &digits[7..9],
        &digits[9..13],
        &digits[13..14],
        &digits[14..16],
        &digits[16..20]
    ))
}
