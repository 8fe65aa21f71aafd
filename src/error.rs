//! Error types for courtfile.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Errors in this enum are the ones that abort a submission before any agent
//! attempt is made; failures during the attempt loop are recorded in the
//! attempt history instead.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for courtfile operations.
#[derive(Error, Debug)]
pub enum FilingError {
    /// User provided invalid arguments or the local setup is incomplete.
    #[error("{0}")]
    UserError(String),

    /// A required filing field is missing or invalid.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The channel hint is not one of the known channels.
    #[error("invalid TJSP channel '{0}'. Use 'eproc' or 'esaj'.")]
    InvalidChannel(String),

    /// The channel hint and the channel implied by the link disagree.
    #[error("TJSP channel '{hint}' does not match the supplied link ({inferred})")]
    ChannelMismatch { hint: String, inferred: String },

    /// The access link could not be parsed as a URL in any candidate form.
    #[error("invalid TJSP access link: '{0}'")]
    UnresolvableLink(String),

    /// No agent script is registered for this identifier.
    #[error("unknown agent '{0}'. Use: tjsp, tjsp2, trf3 or trt2.")]
    UnknownAgent(String),

    /// The session token is missing, invalid, or expired.
    #[error("session invalid or expired")]
    Unauthorized,

    /// Certificate credentials are missing or unreadable.
    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    /// A case number could not be extracted from a document.
    #[error("Case number extraction failed: {0}")]
    Extraction(String),

    /// The submission ran but ended with status `falha`.
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
}

impl FilingError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            FilingError::UserError(_) => exit_codes::USER_ERROR,
            FilingError::Validation(_) => exit_codes::VALIDATION_FAILURE,
            FilingError::InvalidChannel(_)
            | FilingError::ChannelMismatch { .. }
            | FilingError::UnresolvableLink(_) => exit_codes::FLOW_FAILURE,
            FilingError::UnknownAgent(_) => exit_codes::VALIDATION_FAILURE,
            FilingError::Unauthorized => exit_codes::UNAUTHORIZED,
            FilingError::Credentials(_) => exit_codes::USER_ERROR,
            FilingError::Extraction(_) => exit_codes::USER_ERROR,
            FilingError::SubmissionFailed(_) => exit_codes::SUBMISSION_FAILURE,
        }
    }
}

/// Result type alias for courtfile operations.
pub type Result<T> = std::result::Result<T, FilingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_errors_share_exit_code() {
        let errors = [
            FilingError::InvalidChannel("pje".to_string()),
            FilingError::ChannelMismatch {
                hint: "eproc".to_string(),
                inferred: "esaj".to_string(),
            },
            FilingError::UnresolvableLink("%%".to_string()),
        ];
        for err in errors {
            assert_eq!(err.exit_code(), exit_codes::FLOW_FAILURE);
        }
    }

    #[test]
    fn validation_error_has_correct_exit_code() {
        let err = FilingError::Validation("case number is required".to_string());
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_FAILURE);
    }

    #[test]
    fn unauthorized_has_correct_exit_code() {
        assert_eq!(FilingError::Unauthorized.exit_code(), exit_codes::UNAUTHORIZED);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = FilingError::ChannelMismatch {
            hint: "eproc".to_string(),
            inferred: "esaj".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "TJSP channel 'eproc' does not match the supplied link (esaj)"
        );

        let err = FilingError::Validation("file is required".to_string());
        assert_eq!(err.to_string(), "Validation failed: file is required");
    }
}
