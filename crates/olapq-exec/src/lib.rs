#![forbid(unsafe_code)]
//! olapq-exec: evaluate a query plan and shape its output.
//!
//! Flow of `Engine::execute`:
//! 1. build the plan (`olapq-planner`),
//! 2. feed leaf steps from the `LeafSource`,
//! 3. evaluate every other step once, sequentially in topological order or
//!    on a work-stealing pool,
//! 4. assemble the requested roots into a `TabularView` and a `QueryReport`.

pub mod assembler;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod failpoints;
pub mod metrics;
pub mod report;
pub mod runtime;
pub mod scheduler;

pub use assembler::TabularView;
pub use context::{CancellationToken, Executor};
pub use error::ExecError;
pub use report::QueryReport;
pub use runtime::{Engine, QueryResult};
pub use scheduler::Strategy;
