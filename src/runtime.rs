//! Runtime trait and the process-backed implementation

mod harness;
mod process;

use crate::capture::CapturedOutput;
use crate::limits::ResourceLimits;
use crate::types::ExecutionRequest;
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use process::ProcessRuntime;

/// How the sandbox ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDisposition {
    /// Exited on its own with a status code
    Exited(i32),
    /// Killed by a signal
    Signaled(i32),
}

/// Raw, unclassified outcome of one sandbox run
#[derive(Debug)]
pub struct RawRun {
    pub disposition: ExitDisposition,
    /// Whether the wall-clock watchdog forced the termination
    pub timed_out: bool,
    pub stdout: CapturedOutput,
    pub stderr: CapturedOutput,
    pub duration: Duration,
}

/// Runtime abstraction for executing one submission in isolation
///
/// An implementation owns the whole life of one execution context: build it,
/// run the submission under the given limits, capture output, and tear the
/// context down on every exit path. Contexts are never reused across calls.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Run the submission to completion, fault, or forced termination
    ///
    /// Returns `Err` only for engine-side failures (the sandbox could not be
    /// allocated); everything the submission itself does is reported in the
    /// returned [`RawRun`].
    async fn run(&self, request: &ExecutionRequest, limits: &ResourceLimits) -> Result<RawRun>;

    /// Get runtime name
    fn name(&self) -> &str;
}
