use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}

/// Failure classes shared by every layer, so callers can react to the kind
/// of problem without matching each crate's error enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad request or measure definitions; rejected before any graph work.
    Configuration,
    /// Plan building aborted (cycle, failing dependency declaration).
    PlanConstruction,
    /// Internal invariant broken; always a defect.
    Consistency,
    /// The measure algebra or a leaf source failed while computing.
    Computation,
    /// The caller cancelled the query.
    Cancelled,
}
