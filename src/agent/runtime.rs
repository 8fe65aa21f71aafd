//! Runtime candidates for launching agent scripts.
//!
//! Agent scripts are Python. Hosts differ in how Python is exposed, so the
//! gateway tries an ordered list of launch commands and keeps the first one
//! that runs the script to a clean exit.

use crate::error::{FilingError, Result};
use std::path::Path;
use std::process::Command;

/// Conventional launch commands tried after the configured runtime.
pub const FALLBACK_RUNTIMES: [&[&str]; 3] = [&["python3"], &["python"], &["py", "-3"]];

/// One way of launching an agent script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCandidate {
    pub program: String,
    pub args: Vec<String>,
}

impl RuntimeCandidate {
    fn from_parts(parts: &[&str]) -> Self {
        Self {
            program: parts[0].to_string(),
            args: parts[1..].iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build the command that runs `script` with this runtime.
    pub fn command_for(&self, script: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(script);
        command
    }

    /// Shell-style rendering for logs.
    pub fn describe(&self, script: &Path) -> String {
        let mut words = vec![self.program.clone()];
        words.extend(self.args.iter().cloned());
        words.push(script.display().to_string());
        shell_words::join(words)
    }
}

/// Ordered runtime candidates: the configured runtime first, then the fallbacks.
///
/// The configured value is split like a shell command line, so it may carry
/// flags (`/opt/py/bin/python -u`). A fallback identical to the configured
/// runtime is not repeated.
///
/// # Errors
///
/// Returns `FilingError::UserError` if the configured runtime has unbalanced
/// quotes or is empty after splitting.
pub fn runtime_candidates(configured: Option<&str>) -> Result<Vec<RuntimeCandidate>> {
    let mut candidates = Vec::new();

    if let Some(raw) = configured.map(str::trim)
        && !raw.is_empty()
    {
        let words = shell_words::split(raw).map_err(|e| {
            FilingError::UserError(format!(
                "failed to parse agent runtime '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                raw, e
            ))
        })?;
        let Some((program, args)) = words.split_first() else {
            return Err(FilingError::UserError(format!(
                "agent runtime is empty after parsing: '{}'",
                raw
            )));
        };
        candidates.push(RuntimeCandidate {
            program: program.clone(),
            args: args.to_vec(),
        });
    }

    for parts in FALLBACK_RUNTIMES {
        let candidate = RuntimeCandidate::from_parts(parts);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallbacks_only() {
        let candidates = runtime_candidates(None).unwrap();
        let programs: Vec<_> = candidates.iter().map(|c| c.program.as_str()).collect();
        assert_eq!(programs, vec!["python3", "python", "py"]);
        assert_eq!(candidates[2].args, vec!["-3"]);
    }

    #[test]
    fn test_configured_runtime_comes_first() {
        let candidates = runtime_candidates(Some("\"/opt/my python/bin/python\" -u")).unwrap();
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0].program, "/opt/my python/bin/python");
        assert_eq!(candidates[0].args, vec!["-u"]);
    }

    #[test]
    fn test_configured_fallback_is_not_repeated() {
        let candidates = runtime_candidates(Some("python3")).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].program, "python3");
    }

    #[test]
    fn test_blank_runtime_is_ignored() {
        assert_eq!(runtime_candidates(Some("   ")).unwrap().len(), 3);
    }

    #[test]
    fn test_unbalanced_quotes_are_rejected() {
        let err = runtime_candidates(Some("\"python")).unwrap_err();
        assert!(err.to_string().contains("failed to parse agent runtime"));
    }

    #[test]
    fn test_describe_quotes_paths() {
        let candidate = RuntimeCandidate::from_parts(&["py", "-3"]);
        assert_eq!(
            candidate.describe(Path::new("/srv/my agents/robo_tjsp.py")),
            "py -3 '/srv/my agents/robo_tjsp.py'"
        );
    }
}
