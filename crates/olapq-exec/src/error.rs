use thiserror::Error;

use olapq_core::error::ErrorKind;
use olapq_io::IoError;
use olapq_operators::OpError;
use olapq_planner::PlanError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("leaf source: {0}")]
    Source(#[from] IoError),

    #[error("internal consistency violated: {0}")]
    Consistency(String),

    /// `measure_chain` is terse (`c <- [a, b]`), `step_chain` lists the
    /// failing step and its dependencies with full context, one per line.
    #[error("computing {measure_chain} failed: {source}")]
    Computation {
        measure_chain: String,
        step_chain: String,
        #[source]
        source: OpError,
    },

    #[error("query cancelled")]
    Cancelled,

    #[error("hashing error: {0}")]
    Hash(String),
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::Plan(e) => e.kind(),
            ExecError::Source(_) | ExecError::Computation { .. } => ErrorKind::Computation,
            ExecError::Consistency(_) | ExecError::Hash(_) => ErrorKind::Consistency,
            ExecError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<olapq_core::error::Error> for ExecError {
    fn from(e: olapq_core::error::Error) -> Self {
        ExecError::Hash(e.to_string())
    }
}
