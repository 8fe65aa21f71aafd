//! Sequential batch submission.
//!
//! Filings in a batch run one after another, each with all its retries,
//! because the agents share one automation surface. A failing item is
//! recorded and the batch moves on.

use crate::error::{FilingError, Result};
use crate::events::{Event, EventAction};
use crate::extract::CaseNumberExtractor;
use crate::submission::{Orchestrator, SharedFields, SubmissionRequest, SubmissionResult};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub ok: bool,

    /// Source document for document batches, filing file otherwise.
    #[serde(rename = "arquivo")]
    pub file: String,

    #[serde(rename = "numeroProcesso", skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,

    #[serde(rename = "resultadoEnvio", skip_serializing_if = "Option::is_none")]
    pub result: Option<SubmissionResult>,

    #[serde(rename = "erro", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    fn submitted(file: String, result: SubmissionResult) -> Self {
        Self {
            ok: result.ok,
            file,
            case_number: Some(result.case_number.clone()),
            result: Some(result),
            error: None,
        }
    }

    fn failed(file: String, case_number: Option<String>, error: &FilingError) -> Self {
        Self {
            ok: false,
            file,
            case_number,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

/// Ordered outcomes of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    /// True only if every item succeeded.
    pub ok: bool,
    pub total: usize,
    #[serde(rename = "sucesso")]
    pub succeeded: usize,
    #[serde(rename = "falha")]
    pub failed: usize,
    #[serde(rename = "resultados")]
    pub items: Vec<BatchItem>,
}

impl BatchResult {
    fn from_items(items: Vec<BatchItem>) -> Self {
        let succeeded = items.iter().filter(|item| item.ok).count();
        Self {
            ok: succeeded == items.len(),
            total: items.len(),
            succeeded,
            failed: items.len() - succeeded,
            items,
        }
    }
}

pub struct BatchCoordinator<'a> {
    orchestrator: &'a Orchestrator<'a>,
    extractor: &'a dyn CaseNumberExtractor,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(orchestrator: &'a Orchestrator<'a>, extractor: &'a dyn CaseNumberExtractor) -> Self {
        Self {
            orchestrator,
            extractor,
        }
    }

    /// Submit every request in order.
    ///
    /// # Errors
    ///
    /// `Validation` if the batch is empty. Per-item failures are recorded in
    /// the result instead.
    pub fn submit_many(&self, token: &str, requests: &[SubmissionRequest]) -> Result<BatchResult> {
        if requests.is_empty() {
            return Err(FilingError::Validation("empty batch".to_string()));
        }

        let mut items = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            let file = request.file.trim().to_string();
            match self.orchestrator.submit(token, request) {
                Ok(result) => items.push(BatchItem::submitted(file, result)),
                Err(e) => {
                    tracing::warn!(item = index + 1, error = %e, "batch item rejected");
                    let case_number = Some(request.case_number.trim().to_string())
                        .filter(|number| !number.is_empty());
                    items.push(BatchItem::failed(file, case_number, &e));
                }
            }
        }

        Ok(BatchResult::from_items(items))
    }

    /// Submit one filing per document, reading each case number from the
    /// document itself.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the session is invalid, `Validation` if no documents
    /// were given. Per-document failures are recorded in the result and in
    /// the audit trail.
    pub fn submit_from_documents(
        &self,
        token: &str,
        documents: &[PathBuf],
        shared: &SharedFields,
    ) -> Result<BatchResult> {
        let session = self.orchestrator.authenticate(token)?;
        if documents.is_empty() {
            return Err(FilingError::Validation(
                "select at least one PDF document".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(documents.len());
        for document in documents {
            let file = document.to_string_lossy().into_owned();
            let outcome = self
                .extractor
                .extract_case_number(document)
                .and_then(|case_number| {
                    let request = shared.request_for(&case_number, document);
                    self.orchestrator.submit(token, &request)
                });

            match outcome {
                Ok(result) => items.push(BatchItem::submitted(file, result)),
                Err(e) => {
                    tracing::warn!(document = %file, error = %e, "document not submitted");
                    self.orchestrator.audit(
                        Event::new(EventAction::DocumentFailed)
                            .with_actor(&session.operator)
                            .with_details(json!({
                                "arquivo": file,
                                "erro": e.to_string(),
                            })),
                    );
                    items.push(BatchItem::failed(file, None, &e));
                }
            }
        }

        Ok(BatchResult::from_items(items))
    }
}
