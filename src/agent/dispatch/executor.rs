//! Agent subprocess executor.
//!
//! Runs one runtime candidate against an agent script with the payload on
//! stdin, a hard timeout, and output captured to log files.

use crate::agent::runtime::RuntimeCandidate;
use crate::agent::truncate_chars;
use crate::error::{FilingError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Characters of stderr quoted in a failure description.
const STDERR_EXCERPT_CHARS: usize = 2_000;

/// What to run and where to put its output.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Agent script, also determines the working directory.
    pub script: &'a Path,
    /// Serialized payload written to stdin.
    pub input: &'a str,
    /// Directory receiving the stdout/stderr logs.
    pub logs_dir: &'a Path,
    /// Maximum execution time before the process is killed.
    pub timeout: Duration,
}

/// Result of running one candidate.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Exit code of the process (None if killed or didn't exit normally).
    pub exit_code: Option<i32>,
    /// Path to the stdout log file.
    pub stdout_path: PathBuf,
    /// Path to the stderr log file.
    pub stderr_path: PathBuf,
    /// Duration of execution.
    pub duration: Duration,
    /// Whether the process was killed due to timeout.
    pub timed_out: bool,
    /// The command that was executed (for logging).
    pub command: String,
}

impl AgentRun {
    /// Check if the agent ran to a clean exit.
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Read the captured stdout.
    pub fn read_stdout(&self) -> Result<String> {
        read_log(&self.stdout_path)
    }

    /// One-line explanation of why this run did not succeed.
    pub fn failure_description(&self) -> String {
        if self.timed_out {
            return format!(
                "timed out after {} ms running: {}",
                self.duration.as_millis(),
                self.command
            );
        }

        let stderr = read_log(&self.stderr_path).unwrap_or_default();
        let stderr = stderr.trim();
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        format!(
            "agent failed ({}) with code {}. stderr: {}",
            self.command,
            code,
            if stderr.is_empty() {
                "n/a"
            } else {
                truncate_chars(stderr, STDERR_EXCERPT_CHARS)
            }
        )
    }
}

/// Run an agent script with one runtime candidate.
///
/// # Returns
///
/// * `Ok(AgentRun)` - The process was started; inspect `is_success()`
/// * `Err(FilingError::UserError)` - Logs could not be created or the process
///   could not be spawned
pub fn execute_candidate(candidate: &RuntimeCandidate, invocation: Invocation<'_>) -> Result<AgentRun> {
    let command_str = candidate.describe(invocation.script);

    std::fs::create_dir_all(invocation.logs_dir).map_err(|e| {
        FilingError::UserError(format!(
            "failed to create agent logs directory '{}': {}",
            invocation.logs_dir.display(),
            e
        ))
    })?;

    let run_index = next_run_index(invocation.logs_dir);
    let stdout_path = invocation
        .logs_dir
        .join(format!("run-{:02}.stdout.log", run_index));
    let stderr_path = invocation
        .logs_dir
        .join(format!("run-{:02}.stderr.log", run_index));

    let stdout_file = std::fs::File::create(&stdout_path).map_err(|e| {
        FilingError::UserError(format!(
            "failed to create stdout log '{}': {}",
            stdout_path.display(),
            e
        ))
    })?;

    let stderr_file = std::fs::File::create(&stderr_path).map_err(|e| {
        FilingError::UserError(format!(
            "failed to create stderr log '{}': {}",
            stderr_path.display(),
            e
        ))
    })?;

    let mut command = candidate.command_for(invocation.script);
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file));
    if let Some(dir) = invocation.script.parent()
        && !dir.as_os_str().is_empty()
    {
        command.current_dir(dir);
    }

    let start_time = Instant::now();
    let mut child = command.spawn().map_err(|e| {
        FilingError::UserError(format!(
            "failed to execute agent runtime '{}': {}",
            candidate.program, e
        ))
    })?;

    // The write runs on its own thread so an agent that never reads stdin
    // cannot stall the timeout. Dropping the handle closes stdin.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = invocation.input.to_owned();
        let command = command_str.clone();
        thread::spawn(move || {
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                tracing::debug!(command = %command, error = %e, "agent closed stdin early");
            }
        })
    });

    let waited = wait_with_timeout(&mut child, invocation.timeout);
    // A grandchild may still hold the read end of the pipe after a kill, so a
    // writer that has not finished is detached rather than joined.
    if let Some(writer) = writer {
        if writer.is_finished() {
            if writer.join().is_err() {
                tracing::debug!(command = %command_str, "stdin writer panicked");
            }
        } else {
            tracing::debug!(command = %command_str, "agent left stdin unread");
        }
    }
    let (exit_code, timed_out) = waited?;
    let duration = start_time.elapsed();

    Ok(AgentRun {
        exit_code,
        stdout_path,
        stderr_path,
        duration,
        timed_out,
        command: command_str,
    })
}

/// Wait for a child process with timeout.
///
/// Returns (exit_code, timed_out).
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(Option<i32>, bool)> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok((status.code(), false));
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process(child);
                    return Ok((None, true));
                }
                thread::sleep(poll_interval);
            }
            Err(e) => {
                kill_process(child);
                return Err(FilingError::UserError(format!(
                    "failed to check agent process status: {}",
                    e
                )));
            }
        }
    }
}

/// Kill a process and wait for it to terminate.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

/// Next free run number in a logs directory, starting at 1.
fn next_run_index(logs_dir: &Path) -> usize {
    let existing = std::fs::read_dir(logs_dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_name().to_string_lossy().ends_with(".stdout.log"))
                .count()
        })
        .unwrap_or(0);
    existing + 1
}

fn read_log(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        FilingError::UserError(format!(
            "failed to read agent log '{}': {}",
            path.display(),
            e
        ))
    })
}
