#![forbid(unsafe_code)]
//! olapq: a cube query engine that evaluates a graph of measures.
//!
//! Facade over the workspace crates:
//! - [`olapq_core`]: steps, measures, filters, slices, configuration
//! - [`olapq_operators`]: transformators implementing the measure algebra
//! - [`olapq_io`]: leaf sources (in-memory tables, CSV)
//! - [`olapq_planner`]: plan building, topological order, explain, model files
//! - [`olapq_exec`]: schedulers, step evaluation, result assembly

pub use olapq_core;
pub use olapq_exec;
pub use olapq_io;
pub use olapq_operators;
pub use olapq_planner;

pub use olapq_core::prelude;
pub use olapq_exec::{Engine, QueryResult, TabularView};
