//! The query plan: one vertex per distinct step, two edge views.
//!
//! - `underlyings[v]` lists v's child steps in the order its transformator
//!   declared them, duplicates kept. Evaluation hands exactly this list (as
//!   columns) back to the transformator.
//! - `children[v]` / `parents[v]` are the same edges deduplicated. Cycle
//!   checks, topological order and the parallel scheduler's dependency
//!   counters all work on this simple view.
//!
//! Vertices live in an arena indexed by `StepId`; ids follow insertion order,
//! which the builder keeps breadth-first from the roots.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use olapq_core::error::Result as CoreResult;
use olapq_core::hash::{hash_serde, Hash256};
use olapq_core::id::StepId;
use olapq_core::step::Step;

use crate::error::PlanError;
use crate::topo::TopologicalOrder;

/// What evaluating one step produced, recorded for explain output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFeedback {
    /// Number of slices in the produced column.
    pub size: usize,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct QueryPlan {
    steps: Vec<Step>,
    index: HashMap<Step, StepId>,
    underlyings: Vec<Vec<StepId>>,
    children: Vec<BTreeSet<StepId>>,
    parents: Vec<BTreeSet<StepId>>,
    roots: Vec<StepId>,
    feedback: DashMap<StepId, StepFeedback>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- construction (builder only) ----

    /// Id of `step`, inserting it if new. The flag tells whether it was new.
    pub(crate) fn add_vertex(&mut self, step: Step) -> (StepId, bool) {
        if let Some(id) = self.index.get(&step) {
            return (*id, false);
        }
        let id = StepId::new(self.steps.len() as u32);
        self.index.insert(step.clone(), id);
        self.steps.push(step);
        self.underlyings.push(Vec::new());
        self.children.push(BTreeSet::new());
        self.parents.push(BTreeSet::new());
        (id, true)
    }

    pub(crate) fn add_root(&mut self, id: StepId) {
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    /// Append `child` to `parent`'s ordered underlyings and add the simple
    /// edge if missing. A new simple edge closing a cycle is rejected before
    /// anything is recorded.
    pub(crate) fn add_edge(&mut self, parent: StepId, child: StepId) -> Result<(), PlanError> {
        if !self.children[parent.index()].contains(&child) {
            if let Some(path) = self.path(child, parent) {
                let mut names: Vec<String> = vec![self.steps[parent.index()].to_string()];
                names.extend(path.iter().map(|id| self.steps[id.index()].to_string()));
                return Err(PlanError::Cycle {
                    parent: self.steps[parent.index()].to_string(),
                    child: self.steps[child.index()].to_string(),
                    path: names,
                });
            }
            self.children[parent.index()].insert(child);
            self.parents[child.index()].insert(parent);
        }
        self.underlyings[parent.index()].push(child);
        Ok(())
    }

    /// A path `from` → ... → `to` along simple edges, both ends included.
    fn path(&self, from: StepId, to: StepId) -> Option<Vec<StepId>> {
        let mut came_from: HashMap<StepId, StepId> = HashMap::new();
        let mut stack = vec![from];
        let mut seen = BTreeSet::from([from]);
        while let Some(v) = stack.pop() {
            if v == to {
                let mut path = vec![v];
                let mut cur = v;
                while let Some(prev) = came_from.get(&cur) {
                    path.push(*prev);
                    cur = *prev;
                }
                path.reverse();
                return Some(path);
            }
            for c in &self.children[v.index()] {
                if seen.insert(*c) {
                    came_from.insert(*c, v);
                    stack.push(*c);
                }
            }
        }
        None
    }

    // ---- queries ----

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.index()]
    }

    pub fn step_ids(&self) -> impl Iterator<Item = StepId> + '_ {
        (0..self.steps.len()).map(|i| StepId::new(i as u32))
    }

    pub fn id_of(&self, step: &Step) -> Option<StepId> {
        self.index.get(step).copied()
    }

    /// Requested steps, in query order.
    pub fn roots(&self) -> &[StepId] {
        &self.roots
    }

    pub fn is_root(&self, id: StepId) -> bool {
        self.roots.contains(&id)
    }

    /// Ordered child list, duplicates kept.
    pub fn underlying_steps(&self, id: StepId) -> &[StepId] {
        &self.underlyings[id.index()]
    }

    /// Distinct children.
    pub fn dependencies(&self, id: StepId) -> &BTreeSet<StepId> {
        &self.children[id.index()]
    }

    /// Distinct parents.
    pub fn dependents(&self, id: StepId) -> &BTreeSet<StepId> {
        &self.parents[id.index()]
    }

    /// Vertices nothing depends on, in id order. Every root that is not also
    /// some other step's dependency is one of them.
    pub fn recursion_roots(&self) -> Vec<StepId> {
        self.step_ids()
            .filter(|id| self.parents[id.index()].is_empty())
            .collect()
    }

    /// Vertices whose value comes from the leaf source, not a transformator.
    pub fn leaves(&self) -> Vec<StepId> {
        self.step_ids()
            .filter(|id| self.steps[id.index()].measure.is_leaf())
            .collect()
    }

    /// Number of vertices on the longest dependency chain.
    pub fn max_depth(&self) -> usize {
        let mut depth = vec![0usize; self.len()];
        for id in self.topological_order() {
            let below = self.children[id.index()]
                .iter()
                .map(|c| depth[c.index()])
                .max()
                .unwrap_or(0);
            depth[id.index()] = below + 1;
        }
        depth.into_iter().max().unwrap_or(0)
    }

    /// Dependencies-first walk over the simple edges.
    pub fn topological_order(&self) -> TopologicalOrder<'_> {
        TopologicalOrder::new(self)
    }

    /// Stable fingerprint of the plan shape, for reports and explain.
    pub fn fingerprint(&self) -> CoreResult<Hash256> {
        #[derive(Serialize)]
        struct Shape<'a> {
            steps: &'a [Step],
            underlyings: &'a [Vec<StepId>],
            roots: &'a [StepId],
        }
        hash_serde(&Shape {
            steps: &self.steps,
            underlyings: &self.underlyings,
            roots: &self.roots,
        })
    }

    // ---- feedback ----

    pub fn record_feedback(&self, id: StepId, feedback: StepFeedback) {
        self.feedback.insert(id, feedback);
    }

    pub fn feedback(&self, id: StepId) -> Option<StepFeedback> {
        self.feedback.get(&id).map(|f| *f)
    }

    /// Recorded feedback sorted by step id.
    pub fn feedback_entries(&self) -> Vec<(StepId, StepFeedback)> {
        let mut out: Vec<(StepId, StepFeedback)> =
            self.feedback.iter().map(|e| (*e.key(), *e.value())).collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }
}
