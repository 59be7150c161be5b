//! In-memory fact table acting as a leaf source.
//!
//! Filter rows, group them by the step's group-by columns, aggregate the
//! measure column per group. This is the SQL `SELECT g, AGG(c) ... WHERE f
//! GROUP BY g` a real storage pushdown would run.

use std::collections::BTreeMap;

use olapq_core::measure::{Aggregation, Measure};
use olapq_core::step::Step;
use olapq_core::types::{Coordinate, MeasureValue, RowBatch, Slice, SliceColumn};
use olapq_operators::aggregate::Accumulator;

use crate::error::IoError;
use crate::source::LeafSource;

/// Aggregator column name that counts rows rather than values.
pub const COUNT_STAR: &str = "*";

#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    batch: RowBatch,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, batch: RowBatch) -> Self {
        Self {
            name: name.into(),
            batch,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    fn require_column(&self, column: &str) -> Result<usize, IoError> {
        self.batch
            .column_index(column)
            .ok_or_else(|| IoError::UnknownColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Slice of every row passing the step filter, in row order.
    fn matching_slices(&self, step: &Step) -> Result<Vec<(usize, Slice)>, IoError> {
        let group_idx: Vec<(String, usize)> = step
            .group_by
            .columns()
            .map(|c| Ok((c.clone(), self.require_column(c)?)))
            .collect::<Result<_, IoError>>()?;

        let mut out = Vec::new();
        for row in 0..self.batch.num_rows() {
            let lookup = |column: &str| self.batch.value(row, column).map(Coordinate::from);
            if !step.filter.matches(&lookup) {
                continue;
            }
            let mut slice = Slice::grand_total();
            for (name, idx) in &group_idx {
                slice.insert(name.clone(), Coordinate::from(&self.batch.columns[*idx].values[row]));
            }
            out.push((row, slice));
        }
        Ok(out)
    }
}

impl LeafSource for MemoryTable {
    fn leaf_column(&self, step: &Step) -> Result<SliceColumn, IoError> {
        let rows = self.matching_slices(step)?;

        match &step.measure {
            Measure::Empty => Ok(rows
                .into_iter()
                .map(|(_, slice)| (slice, MeasureValue::null()))
                .collect()),
            Measure::Aggregator(agg) => {
                let value_idx = if agg.column == COUNT_STAR && agg.aggregation == Aggregation::Count
                {
                    None
                } else {
                    Some(self.require_column(&agg.column)?)
                };

                let mut groups: BTreeMap<Slice, Accumulator> = BTreeMap::new();
                for (row, slice) in rows {
                    let acc = groups
                        .entry(slice)
                        .or_insert_with(|| Accumulator::new(agg.aggregation));
                    let added = match value_idx {
                        Some(idx) => acc.add(&self.batch.columns[idx].values[row]),
                        None => acc.add(&olapq_core::types::Scalar::Bool(true)),
                    };
                    added.map_err(|source| IoError::Aggregation {
                        measure: agg.name.clone(),
                        source,
                    })?;
                }

                tracing::trace!(
                    table = %self.name,
                    measure = %agg.name,
                    groups = groups.len(),
                    "aggregated leaf column"
                );

                Ok(groups
                    .into_iter()
                    .filter_map(|(slice, acc)| acc.finish().map(|v| (slice, v)))
                    .collect())
            }
            other => Err(IoError::NotALeaf(other.name().to_string())),
        }
    }
}
