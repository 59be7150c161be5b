//! Plan evaluation strategies.
//!
//! Both strategies skip leaf steps (fed beforehand, or an absent empty
//! placeholder) and hand every other step to `compute` exactly once, after
//! all of its dependencies are in the value map.
//!
//! Parallel strategy, per step V:
//! - a unit for V returns if V is computed or already claimed; otherwise it
//!   claims V (atomic swap) and spawns one unit per dependency still missing;
//! - `countdown[V]` starts at (missing dependencies + 1). The claiming unit
//!   and each finished dependency decrement it; whoever reaches zero spawns
//!   V's compute. One decrement reaches zero, so V computes once.
//! - every unit is a heap-allocated rayon spawn: stack depth stays flat
//!   whatever the chain length.
//! - the first error raises an abort flag; remaining units return without
//!   work and that error is the result.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use olapq_core::id::StepId;
use olapq_planner::QueryPlan;

use crate::context::CancellationToken;
use crate::error::ExecError;
use crate::evaluator::ValueMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Sequential,
    Parallel,
}

impl Strategy {
    pub fn from_flag(concurrent: bool) -> Self {
        if concurrent {
            Strategy::Parallel
        } else {
            Strategy::Sequential
        }
    }
}

/// Leaf steps the leaf source must provide: aggregators always, the empty
/// measure only when it was requested as a root.
pub fn leaves_to_feed(plan: &QueryPlan) -> Vec<StepId> {
    plan.leaves()
        .into_iter()
        .filter(|id| !plan.step(*id).measure.is_empty_measure() || plan.is_root(*id))
        .collect()
}

/// Feed every leaf through `feed`, concurrently under the parallel strategy.
pub fn feed_leaves<F>(
    plan: &QueryPlan,
    strategy: Strategy,
    cancel: &CancellationToken,
    feed: F,
) -> Result<(), ExecError>
where
    F: Fn(StepId) -> Result<(), ExecError> + Sync + Send,
{
    let leaves = leaves_to_feed(plan);
    let one = |id: &StepId| {
        cancel.check()?;
        feed(*id)
    };
    match strategy {
        Strategy::Sequential => leaves.iter().try_for_each(one),
        Strategy::Parallel => leaves.par_iter().try_for_each(one),
    }
}

/// Run `compute` for every pending step with the given strategy.
pub fn evaluate_plan<F>(
    plan: &QueryPlan,
    values: &ValueMap,
    strategy: Strategy,
    cancel: &CancellationToken,
    compute: F,
) -> Result<(), ExecError>
where
    F: Fn(StepId) -> Result<(), ExecError> + Sync,
{
    match strategy {
        Strategy::Sequential => run_sequential(plan, values, cancel, compute).map(|_| ()),
        Strategy::Parallel => run_parallel(plan, values, cancel, compute),
    }
}

/// Single-threaded reference strategy. Returns the full topological walk,
/// leaves included, so callers can verify it.
pub fn run_sequential<F>(
    plan: &QueryPlan,
    values: &ValueMap,
    cancel: &CancellationToken,
    compute: F,
) -> Result<Vec<StepId>, ExecError>
where
    F: Fn(StepId) -> Result<(), ExecError>,
{
    let mut walked = Vec::with_capacity(plan.len());
    for id in plan.topological_order() {
        walked.push(id);
        if plan.step(id).measure.is_leaf() || values.contains_key(&id) {
            continue;
        }
        cancel.check()?;
        compute(id)?;
    }
    Ok(walked)
}

fn needs_work(plan: &QueryPlan, values: &ValueMap, id: StepId) -> bool {
    !plan.step(id).measure.is_leaf() && !values.contains_key(&id)
}

struct ParallelRun<'a, F> {
    plan: &'a QueryPlan,
    values: &'a ValueMap,
    cancel: &'a CancellationToken,
    compute: &'a F,
    claimed: Vec<AtomicBool>,
    countdown: Vec<AtomicUsize>,
    aborted: AtomicBool,
    error: Mutex<Option<ExecError>>,
}

impl<'a, F> ParallelRun<'a, F>
where
    F: Fn(StepId) -> Result<(), ExecError> + Sync,
{
    fn needs_work(&self, id: StepId) -> bool {
        needs_work(self.plan, self.values, id)
    }

    fn visit<'s>(&'s self, scope: &rayon::Scope<'s>, id: StepId) {
        if self.aborted.load(Ordering::Acquire) || !self.needs_work(id) {
            return;
        }
        if self.claimed[id.index()].swap(true, Ordering::AcqRel) {
            return;
        }
        for dep in self.plan.dependencies(id) {
            let dep = *dep;
            if self.needs_work(dep) && !self.claimed[dep.index()].load(Ordering::Acquire) {
                scope.spawn(move |s| self.visit(s, dep));
            }
        }
        self.release(scope, id);
    }

    /// One decrement of `id`'s countdown; the last one schedules it.
    fn release<'s>(&'s self, scope: &rayon::Scope<'s>, id: StepId) {
        if self.countdown[id.index()].fetch_sub(1, Ordering::AcqRel) == 1 {
            scope.spawn(move |s| self.run(s, id));
        }
    }

    fn run<'s>(&'s self, scope: &rayon::Scope<'s>, id: StepId) {
        if self.aborted.load(Ordering::Acquire) {
            return;
        }
        let outcome = self.cancel.check().and_then(|()| (self.compute)(id));
        match outcome {
            Ok(()) => {
                for parent in self.plan.dependents(id) {
                    self.release(scope, *parent);
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, e: ExecError) {
        self.aborted.store(true, Ordering::Release);
        let mut slot = self.error.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            *slot = Some(e);
        }
    }
}

/// Work-stealing strategy on the current rayon pool.
pub fn run_parallel<F>(
    plan: &QueryPlan,
    values: &ValueMap,
    cancel: &CancellationToken,
    compute: F,
) -> Result<(), ExecError>
where
    F: Fn(StepId) -> Result<(), ExecError> + Sync,
{
    let countdown = plan
        .step_ids()
        .map(|id| {
            let missing = plan
                .dependencies(id)
                .iter()
                .filter(|d| needs_work(plan, values, **d))
                .count();
            AtomicUsize::new(missing + 1)
        })
        .collect();
    let state = ParallelRun {
        plan,
        values,
        cancel,
        compute: &compute,
        claimed: plan.step_ids().map(|_| AtomicBool::new(false)).collect(),
        countdown,
        aborted: AtomicBool::new(false),
        error: Mutex::new(None),
    };

    let roots = plan.recursion_roots();
    let state = &state;
    rayon::scope(|s| {
        for root in roots {
            s.spawn(move |s| state.visit(s, root));
        }
    });

    if let Some(e) = state
        .error
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .take()
    {
        return Err(e);
    }

    if let Some(id) = plan.step_ids().find(|id| state.needs_work(*id)) {
        return Err(ExecError::Consistency(format!(
            "[{}] was never evaluated",
            plan.step(id)
        )));
    }
    Ok(())
}
