//! Resource ceilings applied to a single execution

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource limits for one sandboxed execution
///
/// All four ceilings are enforced outside the sandboxed code: the wall clock
/// by a watchdog in the runner, CPU time and memory by the kernel, and output
/// size by the capture layer. Exceeding any of them terminates the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall-clock ceiling for the whole run
    pub max_wall_time: Duration,

    /// CPU-time ceiling (RLIMIT_CPU)
    pub max_cpu_time: Duration,

    /// Address-space ceiling in bytes (RLIMIT_AS)
    pub max_memory_bytes: u64,

    /// Captured-output ceiling in bytes, applied to stdout and stderr
    /// independently
    pub max_output_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_wall_time: Duration::from_secs(5),
            max_cpu_time: Duration::from_secs(5),
            max_memory_bytes: 256 * 1024 * 1024, // 256 MB
            max_output_bytes: 64 * 1024,         // 64 KB per stream
        }
    }
}

impl ResourceLimits {
    /// Tight limits for fully untrusted submissions
    pub fn strict() -> Self {
        Self {
            max_wall_time: Duration::from_secs(2),
            max_cpu_time: Duration::from_secs(2),
            max_memory_bytes: 128 * 1024 * 1024, // 128 MB
            max_output_bytes: 16 * 1024,         // 16 KB
        }
    }

    /// Generous limits for long-running exercises
    pub fn permissive() -> Self {
        Self {
            max_wall_time: Duration::from_secs(60),
            max_cpu_time: Duration::from_secs(60),
            max_memory_bytes: 1024 * 1024 * 1024, // 1 GB
            max_output_bytes: 1024 * 1024,        // 1 MB
        }
    }

    /// Replace the wall-clock ceiling, clamping to `cap`
    pub fn with_wall_time_ms(mut self, ms: u64, cap: Duration) -> Self {
        let cap_ms = cap.as_millis() as u64;
        self.max_wall_time = Duration::from_millis(ms.min(cap_ms));
        self
    }
}
