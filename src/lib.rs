//! Codebox - sandboxed execution of untrusted code submissions
//!
//! Accepts source text, runs it in a disposable interpreter process under an
//! allow-list capability policy and hard resource ceilings, and returns a
//! structured result. Executions never share state; every sandbox is torn
//! down when its request finishes, whatever the outcome.

mod capture;
mod classify;
mod config;
mod dispatch;
mod limits;
mod policy;
mod runtime;
mod types;

pub use capture::CapturedOutput;
pub use config::EngineConfig;
pub use dispatch::{ExecutionDispatcher, SubmitError};
pub use limits::ResourceLimits;
pub use policy::{Capability, CapabilityPolicy};
pub use runtime::{ExitDisposition, ProcessRuntime, RawRun, Runtime};
pub use types::{
    CaseResult, ExecutionId, ExecutionRequest, ExecutionResult, ExecutionStatus, TestCase,
    TestReport,
};

/// Re-export common error types
pub type Result<T> = anyhow::Result<T>;
