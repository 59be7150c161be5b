#![forbid(unsafe_code)]
//! olapq-operators: the measure algebra.
//!
//! Design intent:
//! - Measures in `olapq-core` are data; this crate gives each non-leaf kind a
//!   `Transformator` that declares its underlying steps and builds its column
//!   from theirs.
//! - Leaf aggregation kernels (`aggregate`) are shared with leaf sources.
//! - Pure and synchronous: no IO, no threads. Scheduling is `olapq-exec`'s job.

pub mod aggregate;
pub mod combinator;
pub mod filtrator;
pub mod registry;
pub mod traits;

pub use registry::{Registry, TransformatorFactory};
pub use traits::{OpError, Transformator};
