use thiserror::Error;

use olapq_operators::OpError;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("measure '{0}' is not a leaf and cannot be read from a table")]
    NotALeaf(String),

    #[error("aggregating '{measure}': {source}")]
    Aggregation {
        measure: String,
        #[source]
        source: OpError,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
