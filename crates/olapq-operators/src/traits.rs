//! Transformator trait + common interfaces.
//!
//! The planner calls `underlying_steps(...)` once per plan vertex to expand
//! the graph; the executor later calls `produce_column(...)` once per vertex,
//! after every underlying column is available.

use olapq_core::step::Step;
use olapq_core::types::SliceColumn;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("measure '{0}' is a leaf or a reference and has no transformator")]
    NotTransformable(String),

    #[error("no transformator registered under key '{0}'")]
    UnknownKey(String),

    #[error("invalid definition for measure '{measure}': {reason}")]
    Definition { measure: String, reason: String },

    #[error("execution error: {0}")]
    Exec(String),
}

/// Algebra of one non-leaf measure.
///
/// Invariants:
/// - `underlying_steps` is deterministic: the same step yields the same list
///   in the same order. Duplicates are meaningful and preserved.
/// - `produce_column` receives exactly one column per declared underlying,
///   in declaration order, and must not depend on anything else.
pub trait Transformator: Send + Sync {
    /// Name of the measure this transformator computes.
    fn name(&self) -> &str;

    /// Steps whose columns this step needs. References are allowed; the
    /// planner resolves them.
    fn underlying_steps(&self, step: &Step) -> Result<Vec<Step>, OpError>;

    /// Build this step's column from its underlyings.
    fn produce_column(&self, step: &Step, underlyings: &[&SliceColumn])
        -> Result<SliceColumn, OpError>;
}
