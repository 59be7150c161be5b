#![forbid(unsafe_code)]
//! olapq-planner: from a cube query to a deduplicated, acyclic plan of steps.
//!
//! Design:
//! - `builder` expands the requested measures breadth-first (FIFO, so plans
//!   and their explain output are reproducible), resolving references and
//!   asking each transformator for its underlying steps.
//! - `plan` keeps two views of the same vertices: ordered child lists that
//!   preserve duplicates (what transformators consume) and deduplicated edge
//!   sets (what cycle checks and topological walks need).
//! - `topo` yields vertices dependencies-first, `verify` checks such orders,
//!   `explain` renders plans and step feedback for humans.
//! - `dsl::yaml` reads a model file (measures, query, table) for the CLI.

pub mod builder;
pub mod dsl;
pub mod error;
pub mod explain;
pub mod plan;
pub mod resolver;
pub mod topo;
pub mod verify;

pub use builder::PlanBuilder;
pub use dsl::yaml::{parse_yaml_model, ModelFile};
pub use error::PlanError;
pub use plan::{QueryPlan, StepFeedback};
pub use resolver::{MeasureForest, MeasureResolver};
pub use topo::TopologicalOrder;
