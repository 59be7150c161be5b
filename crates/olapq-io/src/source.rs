//! Leaf column source contract.

use olapq_core::step::Step;
use olapq_core::types::SliceColumn;

use crate::error::IoError;

/// Supplies pre-computed columns for leaf steps.
///
/// Called for every aggregator vertex of a plan, and for the empty measure
/// when it is a query root (to enumerate the coordinates of the cube).
pub trait LeafSource: Send + Sync {
    fn leaf_column(&self, step: &Step) -> Result<SliceColumn, IoError>;
}
