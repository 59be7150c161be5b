//! Cube query → `QueryPlan`.
//!
//! Breadth-first expansion from the requested measures. A FIFO queue (not a
//! set) holds pending steps so vertex ids, and therefore explain output, are
//! identical across runs.

use std::collections::{BTreeMap, VecDeque};

use olapq_core::measure::{Measure, EMPTY_MEASURE_NAME};
use olapq_core::query::{CubeQuery, QueryOption};
use olapq_core::step::Step;
use olapq_operators::{OpError, Registry};

use crate::error::PlanError;
use crate::plan::QueryPlan;
use crate::resolver::MeasureResolver;

pub struct PlanBuilder<'a> {
    resolver: &'a dyn MeasureResolver,
    registry: &'a Registry,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(resolver: &'a dyn MeasureResolver, registry: &'a Registry) -> Self {
        Self { resolver, registry }
    }

    pub fn build(&self, query: &CubeQuery) -> Result<QueryPlan, PlanError> {
        let unknown_as_empty = query.options.contains(QueryOption::UnknownMeasuresAreEmpty);
        let roots = self.root_measures(query, unknown_as_empty)?;

        let mut plan = QueryPlan::new();
        let mut pending: VecDeque<_> = VecDeque::new();

        for measure in roots {
            let step = Step::new(measure, query.filter.clone(), query.group_by.clone())
                .with_custom_marker(query.custom_marker.clone());
            let (id, new) = plan.add_vertex(step);
            plan.add_root(id);
            if new {
                pending.push_back(id);
            }
        }

        // A vertex is enqueued exactly when it is created, so "new" already
        // means neither pending nor processed.
        while let Some(id) = pending.pop_front() {
            let step = plan.step(id).clone();
            if step.measure.is_leaf() {
                continue;
            }

            let declared = self
                .registry
                .transformator(&step.measure)
                .and_then(|op| op.underlying_steps(&step))
                .map_err(|source| underlying_error(&step, source))?;

            for child in declared {
                let measure = self.resolve(&child.measure, unknown_as_empty)?;
                let child = Step { measure, ..child };
                let (child_id, new) = plan.add_vertex(child);
                plan.add_edge(id, child_id)?;
                if new {
                    pending.push_back(child_id);
                }
            }
        }

        for id in plan.step_ids() {
            let step = plan.step(id);
            if step.measure.is_reference() {
                return Err(PlanError::UnresolvedReference(step.to_string()));
            }
        }

        tracing::debug!(
            steps = plan.len(),
            roots = plan.roots().len(),
            depth = plan.max_depth(),
            "built query plan"
        );
        Ok(plan)
    }

    /// Resolved root measures in query order, deduplicated. Runs before any
    /// graph work so configuration errors never leave a partial plan.
    fn root_measures(
        &self,
        query: &CubeQuery,
        unknown_as_empty: bool,
    ) -> Result<Vec<Measure>, PlanError> {
        if query.measures.is_empty() {
            return Ok(vec![Measure::Empty]);
        }

        let mut by_name: BTreeMap<String, Measure> = BTreeMap::new();
        let mut out = Vec::with_capacity(query.measures.len());
        for requested in &query.measures {
            if requested.name() == EMPTY_MEASURE_NAME {
                return Err(PlanError::ReservedMeasureName(requested.name().to_string()));
            }
            let resolved = self.resolve(requested, unknown_as_empty)?;
            // results are keyed by the resolved name, not the requested one
            match by_name.get(resolved.name()) {
                Some(existing) if *existing != resolved => {
                    return Err(PlanError::DuplicateMeasureName {
                        name: resolved.name().to_string(),
                        first: existing.to_string(),
                        second: resolved.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    by_name.insert(resolved.name().to_string(), resolved.clone());
                    out.push(resolved);
                }
            }
        }
        Ok(out)
    }

    fn resolve(&self, measure: &Measure, unknown_as_empty: bool) -> Result<Measure, PlanError> {
        match self.resolver.resolve(measure) {
            Err(PlanError::UnknownMeasure(name)) if unknown_as_empty => {
                tracing::debug!(measure = %name, "unknown measure planned as empty");
                Ok(Measure::Empty)
            }
            other => other,
        }
    }
}

fn underlying_error(step: &Step, source: OpError) -> PlanError {
    PlanError::UnderlyingSteps {
        measure: step.measure_name().to_string(),
        step: step.to_string(),
        source,
    }
}
