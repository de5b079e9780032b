//! Process-backed isolated runner
//!
//! One disposable interpreter process per request: scrubbed environment,
//! kernel resource limits applied between fork and exec, piped stdio, and a
//! watchdog that kills the process the moment a wall-clock or output ceiling
//! is hit. The process is reaped on every exit path; nothing survives the
//! request that created it.

use super::{harness, ExitDisposition, RawRun, Runtime};
use crate::capture;
use crate::limits::ResourceLimits;
use crate::policy::CapabilityPolicy;
use crate::types::ExecutionRequest;
use crate::Result;
use anyhow::Context;
use async_trait::async_trait;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Notify;

/// Process-level sandbox around an interpreter binary
pub struct ProcessRuntime {
    interpreter: String,
    policy: CapabilityPolicy,
}

impl ProcessRuntime {
    pub fn new() -> Self {
        Self::with_interpreter("python3")
    }

    pub fn with_interpreter(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            policy: CapabilityPolicy::default(),
        }
    }

    /// Replace the capability policy rendered into the sandbox namespace
    pub fn with_policy(mut self, policy: CapabilityPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for ProcessRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runtime for ProcessRuntime {
    async fn run(&self, request: &ExecutionRequest, limits: &ResourceLimits) -> Result<RawRun> {
        let script = harness::render(&request.code, &self.policy);
        let start = Instant::now();

        let mut command = Command::new(&self.interpreter);
        command
            // isolated mode: no environment hooks, no user site-packages
            .arg("-I")
            .arg("-S")
            .arg("-c")
            .arg(&script)
            .env_clear()
            .env("PATH", "/usr/local/bin:/usr/bin:/bin")
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .current_dir(std::env::temp_dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        apply_rlimits(&mut command, limits);

        let mut child = command
            .spawn()
            .context("failed to spawn sandbox interpreter")?;

        // write stdin and close it, so reads past the end see EOF
        if let Some(mut stdin) = child.stdin.take() {
            let input = request.stdin.clone().unwrap_or_default();
            tokio::spawn(async move {
                let _ = stdin.write_all(input.as_bytes()).await;
                let _ = stdin.shutdown().await;
            });
        }

        let overflow = Arc::new(Notify::new());
        let stdout_pipe = child.stdout.take().context("sandbox stdout not piped")?;
        let stderr_pipe = child.stderr.take().context("sandbox stderr not piped")?;
        let stdout_task = tokio::spawn(capture::capture_stream(
            stdout_pipe,
            limits.max_output_bytes,
            overflow.clone(),
        ));
        let stderr_task = tokio::spawn(capture::capture_stream(
            stderr_pipe,
            limits.max_output_bytes,
            overflow.clone(),
        ));

        let deadline = tokio::time::sleep(limits.max_wall_time);
        tokio::pin!(deadline);

        let mut timed_out = false;
        let mut killed = false;
        let status = loop {
            tokio::select! {
                status = child.wait() => {
                    break status.context("failed to reap sandbox process")?;
                }
                _ = &mut deadline, if !killed => {
                    tracing::debug!(interpreter = %self.interpreter, "wall-clock ceiling hit, killing sandbox");
                    timed_out = true;
                    killed = true;
                    let _ = child.start_kill();
                }
                _ = overflow.notified(), if !killed => {
                    tracing::debug!(interpreter = %self.interpreter, "output ceiling hit, killing sandbox");
                    killed = true;
                    let _ = child.start_kill();
                }
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        let disposition = match status.code() {
            Some(code) => ExitDisposition::Exited(code),
            None => ExitDisposition::Signaled(status.signal().unwrap_or(0)),
        };

        Ok(RawRun {
            disposition,
            timed_out,
            stdout,
            stderr,
            duration: start.elapsed(),
        })
    }

    fn name(&self) -> &str {
        "process"
    }
}

/// Install kernel ceilings in the child between fork and exec
fn apply_rlimits(command: &mut Command, limits: &ResourceLimits) {
    use nix::sys::resource::{setrlimit, Resource};

    let cpu_secs = limits.max_cpu_time.as_secs().max(1);
    let memory = limits.max_memory_bytes;

    fn io_err(errno: nix::errno::Errno) -> std::io::Error {
        std::io::Error::from_raw_os_error(errno as i32)
    }

    // Safety: only async-signal-safe calls run between fork and exec.
    unsafe {
        command.pre_exec(move || {
            // hard limit sits one second above soft so the overrun arrives
            // as SIGXCPU rather than an anonymous SIGKILL
            setrlimit(Resource::RLIMIT_CPU, cpu_secs, cpu_secs + 1).map_err(io_err)?;
            setrlimit(Resource::RLIMIT_AS, memory, memory).map_err(io_err)?;
            // the sandbox gets no scratch files and no children
            setrlimit(Resource::RLIMIT_FSIZE, 0, 0).map_err(io_err)?;
            setrlimit(Resource::RLIMIT_NPROC, 0, 0).map_err(io_err)?;
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interpreter() {
        let runtime = ProcessRuntime::new();
        assert_eq!(runtime.interpreter, "python3");
        assert_eq!(runtime.name(), "process");
    }

    #[test]
    fn test_policy_override_reaches_the_harness() {
        let runtime = ProcessRuntime::new().with_policy(CapabilityPolicy::none());
        let script = harness::render("x = 1", &runtime.policy);
        assert!(script.contains("frozenset([])"));
    }
}
