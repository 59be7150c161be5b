//! Dependencies-first order over a plan.
//!
//! Kahn's algorithm over the simple edges: a vertex becomes ready once all of
//! its distinct children have been yielded. Ready vertices are served FIFO and
//! seeded in id order, so the order is deterministic for a given plan.

use std::collections::VecDeque;

use olapq_core::id::StepId;

use crate::plan::QueryPlan;

pub struct TopologicalOrder<'a> {
    plan: &'a QueryPlan,
    /// Children not yet yielded, per vertex.
    pending: Vec<usize>,
    ready: VecDeque<StepId>,
    yielded: usize,
}

impl<'a> TopologicalOrder<'a> {
    pub fn new(plan: &'a QueryPlan) -> Self {
        let pending: Vec<usize> = plan
            .step_ids()
            .map(|id| plan.dependencies(id).len())
            .collect();
        let ready = plan
            .step_ids()
            .filter(|id| pending[id.index()] == 0)
            .collect();
        Self {
            plan,
            pending,
            ready,
            yielded: 0,
        }
    }

    /// Vertices not yet yielded. Non-zero after exhaustion only if the plan
    /// has a cycle, which the builder never lets through.
    pub fn remaining(&self) -> usize {
        self.plan.len() - self.yielded
    }
}

impl Iterator for TopologicalOrder<'_> {
    type Item = StepId;

    fn next(&mut self) -> Option<StepId> {
        let v = self.ready.pop_front()?;
        self.yielded += 1;
        for p in self.plan.dependents(v) {
            let deg = &mut self.pending[p.index()];
            *deg -= 1;
            if *deg == 0 {
                self.ready.push_back(*p);
            }
        }
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olapq_core::filter::Filter;
    use olapq_core::measure::{Aggregation, Measure};
    use olapq_core::step::{GroupBy, Step};

    fn step(name: &str) -> Step {
        Step::new(
            Measure::aggregator(name, "k", Aggregation::Sum),
            Filter::MatchAll,
            GroupBy::grand_total(),
        )
    }

    #[test]
    fn diamond_yields_children_first() {
        // top -> (l, r) -> bottom, with a duplicate edge top -> l
        let mut plan = QueryPlan::new();
        let (top, _) = plan.add_vertex(step("top"));
        let (l, _) = plan.add_vertex(step("l"));
        let (r, _) = plan.add_vertex(step("r"));
        let (bottom, _) = plan.add_vertex(step("bottom"));
        plan.add_edge(top, l).unwrap();
        plan.add_edge(top, l).unwrap();
        plan.add_edge(top, r).unwrap();
        plan.add_edge(l, bottom).unwrap();
        plan.add_edge(r, bottom).unwrap();

        let mut order = plan.topological_order();
        let got: Vec<StepId> = order.by_ref().collect();
        assert_eq!(got, vec![bottom, l, r, top]);
        assert_eq!(order.remaining(), 0);
        crate::verify::check_topological(&plan, &got).unwrap();
    }

    #[test]
    fn independent_vertices_follow_id_order() {
        let mut plan = QueryPlan::new();
        let ids: Vec<StepId> = ["x", "y", "z"]
            .iter()
            .map(|n| plan.add_vertex(step(n)).0)
            .collect();
        assert_eq!(plan.topological_order().collect::<Vec<_>>(), ids);
    }
}
