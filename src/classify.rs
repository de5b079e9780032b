//! Maps a raw sandbox run onto the closed set of execution outcomes
//!
//! Precedence is strict: a capability violation outranks every resource
//! ceiling, ceilings outrank a syntax error, and an uncaught fault only
//! surfaces when nothing above it applies. Diagnostics are reduced to a
//! single sanitized line; raw interpreter tracebacks never leave the engine.

use crate::limits::ResourceLimits;
use crate::runtime::{ExitDisposition, RawRun};
use crate::types::{ExecutionResult, ExecutionStatus};

/// Exit codes the in-sandbox harness uses to report how a run ended
pub(crate) const EXIT_SYNTAX: i32 = 64;
pub(crate) const EXIT_CAPABILITY: i32 = 65;
pub(crate) const EXIT_FAULT: i32 = 66;
pub(crate) const EXIT_RESOURCE: i32 = 67;

const MAX_MESSAGE_CHARS: usize = 200;

pub(crate) fn classify(run: RawRun, limits: &ResourceLimits) -> ExecutionResult {
    let duration_ms = run.duration.as_millis() as u64;
    let truncated = run.stdout.truncated || run.stderr.truncated;

    // The harness reports its diagnostic as the final stderr line. Only
    // trust it when the exit code is one of the harness's own and the
    // stream was captured in full.
    let harness_exit = matches!(
        run.disposition,
        ExitDisposition::Exited(EXIT_SYNTAX | EXIT_CAPABILITY | EXIT_FAULT | EXIT_RESOURCE)
    );
    let stderr_text = String::from_utf8_lossy(&run.stderr.bytes).into_owned();
    let (mut stderr, diagnostic) = if harness_exit && !run.stderr.truncated {
        split_diagnostic(&stderr_text)
    } else {
        (stderr_text, None)
    };
    if run.stderr.truncated {
        stderr.push_str(crate::capture::TRUNCATION_MARKER);
    }
    let stdout = run.stdout.into_text();

    let (status, message) = match run.disposition {
        ExitDisposition::Exited(EXIT_CAPABILITY) => (
            ExecutionStatus::SecurityViolation,
            diagnostic.unwrap_or_else(|| "capability not permitted".to_string()),
        ),
        _ if truncated => (
            ExecutionStatus::ResourceExceeded,
            "output limit exceeded".to_string(),
        ),
        ExitDisposition::Exited(EXIT_RESOURCE) => (
            ExecutionStatus::ResourceExceeded,
            diagnostic.unwrap_or_else(|| "memory limit exceeded".to_string()),
        ),
        ExitDisposition::Signaled(nix::libc::SIGXCPU) => (
            ExecutionStatus::ResourceExceeded,
            "cpu time limit exceeded".to_string(),
        ),
        _ if run.timed_out => (
            ExecutionStatus::Timeout,
            format!("execution exceeded {}ms", limits.max_wall_time.as_millis()),
        ),
        // killed from outside without a watchdog firing; the kernel's
        // out-of-memory path is the one producer of this
        ExitDisposition::Signaled(nix::libc::SIGKILL) => (
            ExecutionStatus::ResourceExceeded,
            "memory limit exceeded".to_string(),
        ),
        ExitDisposition::Exited(EXIT_SYNTAX) => (
            ExecutionStatus::SyntaxError,
            diagnostic.unwrap_or_else(|| "syntax error".to_string()),
        ),
        ExitDisposition::Exited(EXIT_FAULT) => (
            ExecutionStatus::RuntimeFault,
            diagnostic.unwrap_or_else(|| "uncaught exception".to_string()),
        ),
        ExitDisposition::Exited(0) => (ExecutionStatus::Success, String::new()),
        ExitDisposition::Signaled(signal) => (
            ExecutionStatus::RuntimeFault,
            format!("terminated by signal {signal}"),
        ),
        ExitDisposition::Exited(code) => (
            ExecutionStatus::InternalError,
            format!("sandbox exited with unexpected status {code}"),
        ),
    };

    let message = match status {
        ExecutionStatus::Success => None,
        _ => Some(sanitize(&message)),
    };

    ExecutionResult {
        status,
        stdout,
        stderr,
        duration_ms,
        message,
    }
}

/// Split the harness's final stderr line off from the submission's own output
fn split_diagnostic(stderr: &str) -> (String, Option<String>) {
    let trimmed = stderr.trim_end_matches('\n');
    if trimmed.is_empty() {
        return (String::new(), None);
    }
    match trimmed.rsplit_once('\n') {
        Some((rest, last)) => {
            let rest = rest.trim_end_matches('\n');
            let user = if rest.is_empty() {
                String::new()
            } else {
                format!("{rest}\n")
            };
            (user, Some(last.to_string()))
        }
        None => (String::new(), Some(trimmed.to_string())),
    }
}

/// Collapse a diagnostic to one bounded line
fn sanitize(message: &str) -> String {
    message
        .lines()
        .next()
        .unwrap_or("")
        .chars()
        .take(MAX_MESSAGE_CHARS)
        .collect()
}
