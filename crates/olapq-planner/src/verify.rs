//! Checks for evaluation orders and finished plans.
//!
//! Cheap enough to run under the `Debug` query option; tests use them too.

use std::collections::HashSet;

use olapq_core::id::StepId;

use crate::plan::QueryPlan;

/// Every vertex appears once and after all of its dependencies.
pub fn check_topological(plan: &QueryPlan, order: &[StepId]) -> Result<(), String> {
    let mut seen = HashSet::<StepId>::with_capacity(order.len());
    for id in order {
        for d in plan.dependencies(*id) {
            if !seen.contains(d) {
                return Err(format!("dependency {d} not satisfied before {id}"));
            }
        }
        if !seen.insert(*id) {
            return Err(format!("{id} appears twice"));
        }
    }
    if seen.len() != plan.len() {
        return Err(format!(
            "order covers {} of {} steps",
            seen.len(),
            plan.len()
        ));
    }
    Ok(())
}

/// Panicking form of [`check_topological`].
pub fn assert_topological(plan: &QueryPlan, order: &[StepId]) {
    if let Err(msg) = check_topological(plan, order) {
        panic!("{msg}");
    }
}

/// Both edge views agree: every underlying is a dependency and vice versa,
/// and parents mirror children.
pub fn check_edges(plan: &QueryPlan) -> Result<(), String> {
    for id in plan.step_ids() {
        let distinct: HashSet<StepId> = plan.underlying_steps(id).iter().copied().collect();
        let deps: HashSet<StepId> = plan.dependencies(id).iter().copied().collect();
        if distinct != deps {
            return Err(format!("{id}: ordered and simple children differ"));
        }
        for d in &deps {
            if !plan.dependents(*d).contains(&id) {
                return Err(format!("{d} does not list {id} as a dependent"));
            }
        }
    }
    Ok(())
}
