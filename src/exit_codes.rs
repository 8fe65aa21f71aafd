//! Exit code constants for the courtfile CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, missing configuration, I/O)
//! - 2: Validation failure (missing or invalid filing fields)
//! - 3: Flow resolution failure (channel/link could not be normalized)
//! - 4: Submission completed with status `falha`
//! - 5: Session invalid or expired

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, configuration or credential problems, I/O errors.
pub const USER_ERROR: i32 = 1;

/// Validation failure: a required filing field is missing or invalid.
pub const VALIDATION_FAILURE: i32 = 2;

/// Flow resolution failure: invalid channel, mismatched channel or unusable link.
pub const FLOW_FAILURE: i32 = 3;

/// The agent ran but the filing (or at least one batch item) failed.
pub const SUBMISSION_FAILURE: i32 = 4;

/// The session token was rejected.
pub const UNAUTHORIZED: i32 = 5;
