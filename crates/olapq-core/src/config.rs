//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MIN_WORKER_STACK_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Strategy used when a query does not ask for `Concurrent` itself.
    pub concurrent: bool,

    /// Worker threads of the engine-owned pool. 0 means "available parallelism".
    pub max_parallel_tasks: usize,

    /// Stack size of pool workers. Deep measure chains need more.
    pub worker_stack_bytes: usize,

    /// Force `Explain` on every query.
    pub explain: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrent: false,
            max_parallel_tasks: 0,
            worker_stack_bytes: 8 * 1024 * 1024, // 8 MiB
            explain: false,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `OLAPQ_CONCURRENT`: `1`/`true` to default to the parallel strategy
    /// - `OLAPQ_MAX_PARALLEL_TASKS`: pool size
    /// - `OLAPQ_WORKER_STACK_BYTES`: worker stack size in bytes
    /// - `OLAPQ_EXPLAIN`: `1`/`true` to explain every query
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("OLAPQ_CONCURRENT") {
            if let Some(v) = parse_flag(&s) {
                cfg.concurrent = v;
            }
        }

        if let Ok(s) = std::env::var("OLAPQ_MAX_PARALLEL_TASKS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_parallel_tasks = v;
            }
        }

        if let Ok(s) = std::env::var("OLAPQ_WORKER_STACK_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.worker_stack_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("OLAPQ_EXPLAIN") {
            if let Some(v) = parse_flag(&s) {
                cfg.explain = v;
            }
        }

        cfg
    }

    /// Reject settings no pool can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.worker_stack_bytes < MIN_WORKER_STACK_BYTES {
            return Err(Error::Config(format!(
                "worker_stack_bytes must be at least {MIN_WORKER_STACK_BYTES}, got {}",
                self.worker_stack_bytes
            )));
        }
        Ok(())
    }

    /// Pool size to use, resolving 0 to the machine's parallelism.
    pub fn effective_parallelism(&self) -> usize {
        if self.max_parallel_tasks > 0 {
            return self.max_parallel_tasks;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn explicit_parallelism_wins() {
        let cfg = EngineConfig {
            max_parallel_tasks: 3,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.effective_parallelism(), 3);
        assert!(EngineConfig::default().effective_parallelism() >= 1);
    }

    #[test]
    fn tiny_worker_stacks_are_rejected() {
        assert!(EngineConfig::default().validate().is_ok());
        let cfg = EngineConfig {
            worker_stack_bytes: 1024,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }
}
