//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::filter::Filter;
pub use crate::id::{QueryId, StepId};
pub use crate::measure::{Aggregation, Combination, Measure, EMPTY_MEASURE_NAME};
pub use crate::query::{CubeQuery, QueryOption, QueryOptions};
pub use crate::step::{GroupBy, Step};
pub use crate::types::{Carrier, Coordinate, MeasureValue, RowBatch, Scalar, Slice, SliceColumn};
