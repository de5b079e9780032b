//! Request admission, queueing, and dispatch onto the worker pool
//!
//! The dispatcher is the facade the surrounding application calls. It owns a
//! fixed pool of worker slots plus a bounded FIFO queue in front of them;
//! when both are full a submission is rejected immediately rather than
//! buffered without bound. Each admitted request runs end-to-end on exactly
//! one worker slot and produces exactly one result.

use crate::classify;
use crate::config::EngineConfig;
use crate::limits::ResourceLimits;
use crate::runtime::{ProcessRuntime, Runtime};
use crate::types::{
    CaseResult, ExecutionId, ExecutionRequest, ExecutionResult, ExecutionStatus, TestCase,
    TestReport,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Why a submission was turned away before reaching a sandbox
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Worker pool and queue are both full
    #[error("engine is at capacity, try again later")]
    Busy,

    /// Submission failed validation at admission
    #[error("invalid submission: {0}")]
    InvalidRequest(String),
}

/// Bounded-concurrency execution facade
pub struct ExecutionDispatcher {
    runtime: Arc<dyn Runtime>,
    config: EngineConfig,
    /// worker slots plus queue slots; holding a permit means "admitted"
    admission: Arc<Semaphore>,
    /// one permit per concurrently running sandbox
    workers: Arc<Semaphore>,
}

impl ExecutionDispatcher {
    /// Create a dispatcher backed by the process runtime
    pub fn new(config: EngineConfig) -> Self {
        let runtime = ProcessRuntime::with_interpreter(&config.interpreter);
        Self::with_runtime(config, runtime)
    }

    /// Create a dispatcher with a custom runtime backend
    pub fn with_runtime(config: EngineConfig, runtime: impl Runtime + 'static) -> Self {
        Self {
            admission: Arc::new(Semaphore::new(config.workers + config.queue_depth)),
            workers: Arc::new(Semaphore::new(config.workers)),
            runtime: Arc::new(runtime),
            config,
        }
    }

    /// Execute one submission end-to-end
    ///
    /// Every admitted request produces exactly one [`ExecutionResult`]:
    /// faults inside the sandbox, ceilings hit, and even engine-side
    /// failures all come back as a classified result, never as a panic or
    /// an unhandled error.
    pub async fn submit(&self, request: ExecutionRequest) -> Result<ExecutionResult, SubmitError> {
        if request.code.trim().is_empty() {
            return Err(SubmitError::InvalidRequest(
                "code must not be empty".to_string(),
            ));
        }

        let _admitted = self
            .admission
            .clone()
            .try_acquire_owned()
            .map_err(|_| SubmitError::Busy)?;

        // FIFO among admitted requests
        let _worker = match self.workers.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Ok(ExecutionResult::internal_error("worker pool unavailable")),
        };

        let id = ExecutionId::new();
        let limits = self.effective_limits(&request);
        tracing::debug!(
            execution_id = %id,
            runtime = self.runtime.name(),
            code_len = request.code.len(),
            "executing submission"
        );

        let result = match self.runtime.run(&request, &limits).await {
            Ok(raw) => classify::classify(raw, &limits),
            Err(err) => {
                tracing::error!(execution_id = %id, error = %err, "sandbox allocation failed");
                ExecutionResult::internal_error("sandbox unavailable")
            }
        };

        if result.status == ExecutionStatus::InternalError {
            tracing::error!(
                execution_id = %id,
                detail = result.message.as_deref().unwrap_or(""),
                "execution failed inside the engine"
            );
        } else {
            tracing::info!(
                execution_id = %id,
                status = ?result.status,
                duration_ms = result.duration_ms,
                "execution finished"
            );
        }

        Ok(result)
    }

    /// Grade a submission against a set of test cases
    ///
    /// Runs the code once per case with the case's input as stdin and
    /// compares trimmed stdout against the expectation. Persisting the
    /// report is the caller's business; the engine keeps no history.
    pub async fn run_test_cases(
        &self,
        code: &str,
        cases: &[TestCase],
    ) -> Result<TestReport, SubmitError> {
        let mut results = Vec::with_capacity(cases.len());
        let mut passed = 0;

        for case in cases {
            let request = ExecutionRequest::new(code).with_stdin(case.input.clone());
            let outcome = self.submit(request).await?;
            let ok = outcome.success() && outcome.stdout.trim() == case.expected.trim();
            if ok {
                passed += 1;
            }
            results.push(CaseResult {
                passed: ok,
                status: outcome.status,
                stdout: outcome.stdout,
            });
        }

        let total = cases.len();
        let score = if total == 0 {
            0.0
        } else {
            (passed as f64 / total as f64 * 1000.0).round() / 10.0
        };

        Ok(TestReport {
            passed,
            total,
            score,
            results,
        })
    }

    /// Per-request ceilings: the configured defaults with the caller's
    /// timeout override clamped to the hard maximum
    fn effective_limits(&self, request: &ExecutionRequest) -> ResourceLimits {
        let mut limits = self.config.limits.clone();
        if let Some(ms) = request.timeout_ms {
            limits = limits.with_wall_time_ms(ms, self.config.max_timeout);
        }
        limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturedOutput;
    use crate::runtime::{ExitDisposition, RawRun};
    use crate::Result;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Runtime stub that parks until a release permit shows up, then
    /// reports a clean exit
    struct ParkedRuntime {
        release: Arc<Semaphore>,
    }

    #[async_trait]
    impl Runtime for ParkedRuntime {
        async fn run(&self, _request: &ExecutionRequest, _limits: &ResourceLimits) -> Result<RawRun> {
            // the permit recycles on drop, so one release frees every waiter
            let _ = self.release.acquire().await;
            Ok(RawRun {
                disposition: ExitDisposition::Exited(0),
                timed_out: false,
                stdout: CapturedOutput::default(),
                stderr: CapturedOutput::default(),
                duration: Duration::from_millis(1),
            })
        }

        fn name(&self) -> &str {
            "parked"
        }
    }

    /// Runtime stub that always fails to allocate a sandbox
    struct BrokenRuntime;

    #[async_trait]
    impl Runtime for BrokenRuntime {
        async fn run(&self, _request: &ExecutionRequest, _limits: &ResourceLimits) -> Result<RawRun> {
            anyhow::bail!("no interpreter")
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn small_config(workers: usize, queue_depth: usize) -> EngineConfig {
        EngineConfig {
            workers,
            queue_depth,
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_empty_code_is_rejected_before_admission() {
        let dispatcher = ExecutionDispatcher::with_runtime(small_config(1, 0), BrokenRuntime);
        let err = dispatcher
            .submit(ExecutionRequest::new("   \n"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_saturated_pool_rejects_with_busy() {
        let release = Arc::new(Semaphore::new(0));
        let dispatcher = Arc::new(ExecutionDispatcher::with_runtime(
            small_config(1, 0),
            ParkedRuntime {
                release: release.clone(),
            },
        ));

        let first = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.submit(ExecutionRequest::new("x = 1")).await })
        };

        // wait until the first submission holds the only worker slot
        while dispatcher.workers.available_permits() > 0 {
            tokio::task::yield_now().await;
        }

        let err = dispatcher
            .submit(ExecutionRequest::new("x = 2"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Busy));

        release.add_permits(1);
        let result = first.await.unwrap().unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_queue_admits_up_to_its_depth() {
        let release = Arc::new(Semaphore::new(0));
        let dispatcher = Arc::new(ExecutionDispatcher::with_runtime(
            small_config(1, 1),
            ParkedRuntime {
                release: release.clone(),
            },
        ));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.submit(ExecutionRequest::new("x = 1")).await
            }));
        }

        // one running plus one queued exhausts admission
        while dispatcher.admission.available_permits() > 0 {
            tokio::task::yield_now().await;
        }
        let err = dispatcher
            .submit(ExecutionRequest::new("x = 3"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Busy));

        release.add_permits(1);
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.status, ExecutionStatus::Success);
        }
    }

    #[tokio::test]
    async fn test_runtime_failure_becomes_internal_error_result() {
        let dispatcher = ExecutionDispatcher::with_runtime(small_config(1, 0), BrokenRuntime);
        let result = dispatcher
            .submit(ExecutionRequest::new("x = 1"))
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::InternalError);
        assert_eq!(result.message.as_deref(), Some("sandbox unavailable"));
    }

    #[tokio::test]
    async fn test_timeout_override_is_clamped_to_hard_maximum() {
        let dispatcher = ExecutionDispatcher::with_runtime(small_config(1, 0), BrokenRuntime);
        let limits =
            dispatcher.effective_limits(&ExecutionRequest::new("x").with_timeout_ms(600_000));
        assert_eq!(limits.max_wall_time, dispatcher.config.max_timeout);

        let limits = dispatcher.effective_limits(&ExecutionRequest::new("x").with_timeout_ms(250));
        assert_eq!(limits.max_wall_time, Duration::from_millis(250));
    }
}
