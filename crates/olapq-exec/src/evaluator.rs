//! One step in, one column out.
//!
//! The evaluator owns every write to the value map. Writes are
//! insert-if-absent: a step finding its slot already filled means it ran
//! twice, which no scheduler may allow.

use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use olapq_core::id::StepId;
use olapq_core::types::{MeasureValue, Slice, SliceColumn};
use olapq_io::LeafSource;
use olapq_operators::{OpError, Registry};
use olapq_planner::{QueryPlan, StepFeedback};

use crate::error::ExecError;
use crate::fail_point;

/// Computed columns, shared by all workers of one query.
pub type ValueMap = DashMap<StepId, Arc<SliceColumn>>;

pub struct StepEvaluator<'a> {
    plan: &'a QueryPlan,
    registry: &'a Registry,
    source: &'a dyn LeafSource,
    values: &'a ValueMap,
    exceptions_as_values: bool,
    debug: bool,
}

impl<'a> StepEvaluator<'a> {
    pub fn new(
        plan: &'a QueryPlan,
        registry: &'a Registry,
        source: &'a dyn LeafSource,
        values: &'a ValueMap,
    ) -> Self {
        Self {
            plan,
            registry,
            source,
            values,
            exceptions_as_values: false,
            debug: false,
        }
    }

    /// Capture computation failures as `MeasureValue::Error` cells instead of
    /// aborting the query.
    pub fn exceptions_as_values(mut self, on: bool) -> Self {
        self.exceptions_as_values = on;
        self
    }

    pub fn debug(mut self, on: bool) -> Self {
        self.debug = on;
        self
    }

    pub fn values(&self) -> &ValueMap {
        self.values
    }

    /// Fetch a leaf step's column from the leaf source.
    pub fn evaluate_leaf(&self, id: StepId) -> Result<(), ExecError> {
        let step = self.plan.step(id);
        let started = Instant::now();
        let column = self.source.leaf_column(step)?;
        self.finish(id, column, started)
    }

    /// Compute a non-leaf step from its dependencies' columns.
    pub fn evaluate(&self, id: StepId) -> Result<(), ExecError> {
        let step = self.plan.step(id);
        fail_point!("evaluate_step", step.measure_name());
        let started = Instant::now();

        let empty = Arc::new(SliceColumn::new());
        let mut inputs: Vec<Arc<SliceColumn>> =
            Vec::with_capacity(self.plan.underlying_steps(id).len());
        for dep in self.plan.underlying_steps(id) {
            let found = self.values.get(dep).map(|c| Arc::clone(c.value()));
            match found {
                Some(column) => inputs.push(column),
                None if self.plan.step(*dep).measure.is_empty_measure() => {
                    inputs.push(Arc::clone(&empty))
                }
                None => {
                    return Err(ExecError::Consistency(format!(
                        "[{}] needs [{}] which was never computed",
                        step,
                        self.plan.step(*dep)
                    )))
                }
            }
        }
        let refs: Vec<&SliceColumn> = inputs.iter().map(|c| c.as_ref()).collect();

        let produced = self
            .registry
            .transformator(&step.measure)
            .and_then(|op| op.produce_column(step, &refs));

        let column = match produced {
            Ok(column) => column,
            Err(source) => {
                let err = self.computation_error(id, source);
                if !self.exceptions_as_values {
                    return Err(err);
                }
                tracing::warn!(error = %err, "step failed, captured as value");
                error_column(&err.to_string(), &refs)
            }
        };

        self.finish(id, column, started)
    }

    fn finish(&self, id: StepId, column: SliceColumn, started: Instant) -> Result<(), ExecError> {
        let size = column.len();
        self.store(id, column)?;
        let duration = started.elapsed();
        self.plan
            .record_feedback(id, StepFeedback { size, duration });

        if self.debug {
            tracing::debug!(
                step = %self.plan.step(id),
                size,
                duration_us = duration.as_micros() as u64,
                "evaluated step"
            );
        } else {
            tracing::trace!(step = id.get(), size, "evaluated step");
        }
        Ok(())
    }

    fn store(&self, id: StepId, column: SliceColumn) -> Result<(), ExecError> {
        match self.values.entry(id) {
            Entry::Occupied(_) => Err(ExecError::Consistency(format!(
                "[{}] evaluated twice",
                self.plan.step(id)
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(column));
                Ok(())
            }
        }
    }

    fn computation_error(&self, id: StepId, source: OpError) -> ExecError {
        let step = self.plan.step(id);
        let deps = self.plan.underlying_steps(id);

        let dep_names: Vec<&str> = deps
            .iter()
            .map(|d| self.plan.step(*d).measure_name())
            .collect();
        let measure_chain = format!("{} <- [{}]", step.measure_name(), dep_names.join(", "));

        let mut step_chain = step.to_string();
        for d in deps {
            step_chain.push_str("\n  <- ");
            step_chain.push_str(&self.plan.step(*d).to_string());
        }

        ExecError::Computation {
            measure_chain,
            step_chain,
            source,
        }
    }
}

/// The failure as a value on every slice the inputs cover, or on the grand
/// total when they cover none.
fn error_column(message: &str, inputs: &[&SliceColumn]) -> SliceColumn {
    let mut column: SliceColumn = inputs
        .iter()
        .flat_map(|c| c.slices())
        .map(|slice| {
            (
                slice.clone(),
                MeasureValue::Error {
                    error: message.to_string(),
                },
            )
        })
        .collect();
    if column.is_empty() {
        column.insert(
            Slice::grand_total(),
            MeasureValue::Error {
                error: message.to_string(),
            },
        );
    }
    column
}
