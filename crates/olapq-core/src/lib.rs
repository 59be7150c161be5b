#![forbid(unsafe_code)]
//! olapq-core: shared vocabulary of the cube engine.
//!
//! Everything here is pure data: steps, measures, filters, slices, columns,
//! configuration and hashing. Planning lives in `olapq-planner`, evaluation
//! in `olapq-exec`, and the measure algebra in `olapq-operators`.

pub mod config;
pub mod error;
pub mod filter;
pub mod hash;
pub mod id;
pub mod measure;
pub mod prelude;
pub mod query;
pub mod step;
pub mod types;

/// Engine version string stamped into query reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
