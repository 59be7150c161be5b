//! Where and under which conditions a query runs.
//!
//! `Executor` is the unit a whole query is submitted to; the caller blocks
//! until it returns. The pool is engine-local: its size and worker stack come
//! from `EngineConfig`. A failure to spawn threads degrades to one thread,
//! then to inline execution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use olapq_core::config::EngineConfig;

use crate::error::ExecError;

#[derive(Debug, Clone)]
pub enum Executor {
    /// Run on the calling thread. The parallel strategy then uses rayon's
    /// global pool.
    Inline,
    Pool(Arc<ThreadPool>),
}

impl Executor {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        let requested = cfg.effective_parallelism().max(1);
        let stack = cfg.worker_stack_bytes;
        let try_build = |n: usize| {
            ThreadPoolBuilder::new()
                .num_threads(n)
                .stack_size(stack)
                .thread_name(|i| format!("olapq-worker-{i}"))
                .build()
        };

        match try_build(requested) {
            Ok(pool) => Executor::Pool(Arc::new(pool)),
            Err(e) if requested > 1 => {
                tracing::warn!(requested, error = %e, "falling back to a single worker");
                match try_build(1) {
                    Ok(pool) => Executor::Pool(Arc::new(pool)),
                    Err(_) => Executor::Inline,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "no worker pool, running inline");
                Executor::Inline
            }
        }
    }

    /// Run `f` to completion on this executor.
    pub fn install<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self {
            Executor::Inline => f(),
            Executor::Pool(pool) => pool.install(f),
        }
    }

    pub fn threads(&self) -> usize {
        match self {
            Executor::Inline => 1,
            Executor::Pool(pool) => pool.current_num_threads(),
        }
    }
}

/// Cooperative cancellation, checked at every step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<(), ExecError> {
        if self.is_cancelled() {
            Err(ExecError::Cancelled)
        } else {
            Ok(())
        }
    }
}
