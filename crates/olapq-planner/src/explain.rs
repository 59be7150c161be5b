//! Human-readable plan dumps.
//!
//! The tree walks the ordered underlyings from each root. A step already
//! printed is shown again as `!#id` without its subtree, so shared branches
//! appear once.

use std::collections::HashSet;

use olapq_core::id::StepId;

use crate::plan::QueryPlan;

/// Indented plan tree, one line per edge, roots in query order.
pub fn explain_plan(plan: &QueryPlan) -> Vec<String> {
    let mut lines = Vec::with_capacity(plan.len() + 1);
    match plan.fingerprint() {
        Ok(h) => lines.push(format!("plan {} steps={}", h.short(), plan.len())),
        Err(_) => lines.push(format!("plan steps={}", plan.len())),
    }
    let mut printed = HashSet::new();
    for root in plan.roots() {
        render(plan, *root, "", "", &mut printed, &mut lines);
    }
    lines
}

fn render(
    plan: &QueryPlan,
    id: StepId,
    head: &str,
    tail: &str,
    printed: &mut HashSet<StepId>,
    lines: &mut Vec<String>,
) {
    if !printed.insert(id) {
        lines.push(format!("{head}!#{} {}", id.get(), plan.step(id)));
        return;
    }
    lines.push(format!("{head}#{} {}", id.get(), plan.step(id)));

    let children = plan.underlying_steps(id);
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (h, t) = if last { ("\\-- ", "    ") } else { ("|-- ", "|   ") };
        render(
            plan,
            *child,
            &format!("{tail}{h}"),
            &format!("{tail}{t}"),
            printed,
            lines,
        );
    }
}

/// Recorded size and duration per evaluated step, by step id.
pub fn explain_feedback(plan: &QueryPlan) -> Vec<String> {
    plan.feedback_entries()
        .into_iter()
        .map(|(id, fb)| {
            format!(
                "#{} size={} duration={}us m={}",
                id.get(),
                fb.size,
                fb.duration.as_micros(),
                plan.step(id).measure
            )
        })
        .collect()
}

/// Emit explain lines at `info` level.
pub fn log_lines(query: &str, lines: &[String]) {
    for line in lines {
        tracing::info!(query = %query, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StepFeedback;
    use olapq_core::filter::Filter;
    use olapq_core::measure::{Aggregation, Measure};
    use olapq_core::step::{GroupBy, Step};
    use std::time::Duration;

    fn step(name: &str) -> Step {
        Step::new(
            Measure::aggregator(name, "k", Aggregation::Sum),
            Filter::MatchAll,
            GroupBy::grand_total(),
        )
    }

    #[test]
    fn shared_steps_are_printed_once() {
        let mut plan = QueryPlan::new();
        let (top, _) = plan.add_vertex(step("top"));
        let (mid, _) = plan.add_vertex(step("mid"));
        let (leaf, _) = plan.add_vertex(step("leaf"));
        plan.add_root(top);
        plan.add_edge(top, mid).unwrap();
        plan.add_edge(top, leaf).unwrap();
        plan.add_edge(mid, leaf).unwrap();

        let lines = explain_plan(&plan);
        assert!(lines[0].starts_with("plan "));
        assert!(lines[1].starts_with("#0 m=top"));
        assert!(lines[2].starts_with("|-- #1 m=mid"));
        assert!(lines[3].starts_with("|   \\-- #2 m=leaf"));
        assert!(lines[4].starts_with("\\-- !#2 m=leaf"));
        assert_eq!(lines.len(), 5);
        // reproducible
        assert_eq!(lines, explain_plan(&plan));
    }

    #[test]
    fn feedback_lines() {
        let mut plan = QueryPlan::new();
        let (a, _) = plan.add_vertex(step("a"));
        plan.record_feedback(
            a,
            StepFeedback {
                size: 2,
                duration: Duration::from_micros(7),
            },
        );
        assert_eq!(
            explain_feedback(&plan),
            vec!["#0 size=2 duration=7us m=a=Sum(k)".to_string()]
        );
    }
}
