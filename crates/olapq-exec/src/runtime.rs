//! Engine: plan, evaluate and assemble one cube query.
//!
//! The whole evaluation is one unit submitted to the engine's `Executor`;
//! the calling thread blocks until it returns. Strategy comes from the
//! query's `Concurrent` option, else from `EngineConfig::concurrent`.

use std::sync::Arc;

use olapq_core::config::EngineConfig;
use olapq_core::id::QueryId;
use olapq_core::query::{CubeQuery, QueryOption};
use olapq_io::LeafSource;
use olapq_operators::Registry;
use olapq_planner::explain::{explain_feedback, explain_plan, log_lines};
use olapq_planner::{MeasureResolver, PlanBuilder, QueryPlan};

use crate::assembler::{assemble, TabularView};
use crate::context::{CancellationToken, Executor};
use crate::error::ExecError;
use crate::evaluator::{StepEvaluator, ValueMap};
use crate::metrics::emit_span;
use crate::report::{now_ms, QueryReport};
use crate::scheduler::{self, Strategy};

#[derive(Debug)]
pub struct QueryResult {
    pub view: TabularView,
    pub report: QueryReport,
}

/// Engine owns the measure definitions, the transformator registry, the leaf
/// source and the executor queries run on.
pub struct Engine {
    cfg: EngineConfig,
    registry: Registry,
    resolver: Arc<dyn MeasureResolver>,
    source: Arc<dyn LeafSource>,
    executor: Executor,
}

impl Engine {
    pub fn new(
        cfg: EngineConfig,
        resolver: Arc<dyn MeasureResolver>,
        source: Arc<dyn LeafSource>,
    ) -> Self {
        let executor = Executor::from_config(&cfg);
        Self {
            cfg,
            registry: Registry::new(),
            resolver,
            source,
            executor,
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn plan(&self, query: &CubeQuery) -> Result<QueryPlan, ExecError> {
        Ok(PlanBuilder::new(self.resolver.as_ref(), &self.registry).build(query)?)
    }

    /// Explain lines for `query` without evaluating it.
    pub fn explain(&self, query: &CubeQuery) -> Result<Vec<String>, ExecError> {
        Ok(explain_plan(&self.plan(query)?))
    }

    pub fn execute(&self, query: &CubeQuery) -> Result<QueryResult, ExecError> {
        self.execute_with(query, &CancellationToken::new())
    }

    pub fn execute_with(
        &self,
        query: &CubeQuery,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, ExecError> {
        let started_ms = now_ms();
        let id = QueryId::random();
        let opts = &query.options;

        let plan = self.plan(query)?;
        let plan_hash = plan.fingerprint()?;
        let strategy =
            Strategy::from_flag(opts.contains(QueryOption::Concurrent) || self.cfg.concurrent);
        let explain = opts.contains(QueryOption::Explain) || self.cfg.explain;
        let debug = opts.contains(QueryOption::Debug);

        tracing::debug!(
            query = %id,
            steps = plan.len(),
            ?strategy,
            plan = %plan_hash.short(),
            "executing query"
        );
        if explain {
            log_lines(&id.to_string(), &explain_plan(&plan));
        }

        let values = ValueMap::new();
        let evaluator = StepEvaluator::new(&plan, &self.registry, self.source.as_ref(), &values)
            .exceptions_as_values(opts.contains(QueryOption::ExceptionsAsMeasureValue))
            .debug(debug);

        self.executor.install(|| {
            scheduler::feed_leaves(&plan, strategy, cancel, |step| {
                evaluator.evaluate_leaf(step)
            })?;
            match strategy {
                Strategy::Sequential if debug => {
                    let walked = scheduler::run_sequential(&plan, &values, cancel, |step| {
                        evaluator.evaluate(step)
                    })?;
                    olapq_planner::verify::check_topological(&plan, &walked)
                        .map_err(ExecError::Consistency)
                }
                _ => scheduler::evaluate_plan(&plan, &values, strategy, cancel, |step| {
                    evaluator.evaluate(step)
                }),
            }
        })?;

        let view = assemble(
            &plan,
            &values,
            opts.contains(QueryOption::AggregationCarriersStayWrapped),
        );

        if explain {
            log_lines(&id.to_string(), &explain_feedback(&plan));
        }

        let report = QueryReport::new(id, plan_hash, strategy, started_ms).finish(&plan, now_ms());
        emit_span(
            "query_finished",
            &[
                ("query", id.to_string()),
                ("steps", plan.len().to_string()),
                ("rows", view.len().to_string()),
                (
                    "elapsed_ms",
                    report.finished_ms.saturating_sub(report.started_ms).to_string(),
                ),
            ],
        );
        Ok(QueryResult { view, report })
    }
}
