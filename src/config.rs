//! Engine configuration

use crate::limits::ResourceLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deployment knobs for the execution engine
///
/// Every field has a default, so a deployment can deserialize this from a
/// partial config section or just use `EngineConfig::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Concurrently running sandboxes
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Requests allowed to wait for a worker before submissions are
    /// rejected outright; zero means fail-fast under load
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Interpreter binary used for sandbox processes
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Hard ceiling on per-request timeout overrides
    #[serde(default = "default_max_timeout")]
    pub max_timeout: Duration,

    /// Default per-execution resource ceilings
    #[serde(default)]
    pub limits: ResourceLimits,
}

fn default_workers() -> usize {
    4
}

fn default_queue_depth() -> usize {
    16
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_max_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_depth: default_queue_depth(),
            interpreter: default_interpreter(),
            max_timeout: default_max_timeout(),
            limits: ResourceLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_config() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_depth, 16);
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.max_timeout, Duration::from_secs(30));
        assert_eq!(config.limits, ResourceLimits::default());
    }

    #[test]
    fn test_partial_override() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"workers": 2, "interpreter": "python3.12"}"#).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.interpreter, "python3.12");
        assert_eq!(config.queue_depth, 16);
    }
}
