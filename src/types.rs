//! Core types for sandbox execution

use serde::{Deserialize, Serialize};

/// Unique identifier for one execution, used for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub uuid::Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request to execute one untrusted submission
///
/// Immutable once accepted; the engine never mutates or retains it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The code to execute
    pub code: String,

    /// Optional stdin fed to the submission
    pub stdin: Option<String>,

    /// Optional wall-clock timeout override in milliseconds, clamped to the
    /// engine's hard maximum
    pub timeout_ms: Option<u64>,
}

impl ExecutionRequest {
    /// Create a simple execution request
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            stdin: None,
            timeout_ms: None,
        }
    }

    /// Feed input to the submission's stdin
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Override the wall-clock timeout in milliseconds
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

/// How one execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Ran to completion with no fault
    Success,
    /// The submission failed to compile and never entered the sandbox
    SyntaxError,
    /// An uncaught fault during otherwise-permitted execution
    RuntimeFault,
    /// The wall-clock ceiling was hit
    Timeout,
    /// A memory, CPU-time, or output-size ceiling was hit
    ResourceExceeded,
    /// The submission referenced a capability outside the allow-list
    SecurityViolation,
    /// Engine-side failure unrelated to the submitted code
    InternalError,
}

/// Result of one execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcome kind
    pub status: ExecutionStatus,

    /// Captured stdout, possibly truncated
    pub stdout: String,

    /// Captured stderr, possibly truncated
    pub stderr: String,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,

    /// Single-line diagnostic, present on every non-Success outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecutionResult {
    /// Check if the execution succeeded
    pub fn success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Result for an engine-side failure; carries no sandbox output
    pub(crate) fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::InternalError,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
            message: Some(message.into()),
        }
    }
}

/// One grading case: stdin fed to the submission and the stdout expected back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    pub expected: String,
}

/// Outcome of a single grading case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub passed: bool,
    pub status: ExecutionStatus,
    pub stdout: String,
}

/// Aggregate grading outcome for one submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub passed: usize,
    pub total: usize,
    /// Percentage of cases passed, 0-100, one decimal place
    pub score: f64,
    pub results: Vec<CaseResult>,
}
