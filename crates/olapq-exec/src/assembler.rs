//! Computed root columns → caller-facing table.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use olapq_core::types::{MeasureValue, Slice};
use olapq_planner::QueryPlan;

use crate::evaluator::ValueMap;

/// One row per slice, one cell per requested measure name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularView {
    rows: HashMap<Slice, BTreeMap<String, MeasureValue>>,
}

impl TabularView {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            rows: HashMap::with_capacity(rows),
        }
    }

    pub fn insert(&mut self, slice: Slice, measure: impl Into<String>, value: MeasureValue) {
        self.rows
            .entry(slice)
            .or_default()
            .insert(measure.into(), value);
    }

    pub fn get(&self, slice: &Slice, measure: &str) -> Option<&MeasureValue> {
        self.rows.get(slice).and_then(|row| row.get(measure))
    }

    pub fn row(&self, slice: &Slice) -> Option<&BTreeMap<String, MeasureValue>> {
        self.rows.get(slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn measure_names(&self) -> BTreeSet<&str> {
        self.rows
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect()
    }

    /// Rows ordered by slice, for stable printing and comparison.
    pub fn sorted_rows(&self) -> Vec<(&Slice, &BTreeMap<String, MeasureValue>)> {
        let mut rows: Vec<_> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        rows
    }
}

/// Write every root's column under the root's measure name.
///
/// The empty measure only enumerates coordinates, so its cells are nulled.
/// Carriers are collapsed to their scalar unless `keep_carriers`.
pub fn assemble(plan: &QueryPlan, values: &ValueMap, keep_carriers: bool) -> TabularView {
    let largest = values.iter().map(|c| c.value().len()).max().unwrap_or(0);
    let mut view = TabularView::with_capacity(largest);

    for root in plan.roots() {
        let step = plan.step(*root);
        let Some(column) = values.get(root).map(|c| c.value().clone()) else {
            tracing::warn!(step = %step, "no column computed for requested measure");
            continue;
        };
        let empty = step.measure.is_empty_measure();
        for (slice, value) in column.iter() {
            let value = if empty {
                MeasureValue::null()
            } else if keep_carriers {
                value.clone()
            } else {
                value.clone().unwrap_carrier()
            };
            view.insert(slice.clone(), step.measure_name(), value);
        }
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use olapq_core::measure::{Aggregation, Measure};
    use olapq_core::query::CubeQuery;
    use olapq_core::types::{Carrier, Scalar, SliceColumn};
    use olapq_operators::Registry;
    use olapq_planner::{MeasureForest, PlanBuilder};
    use std::sync::Arc;

    fn plan(query: CubeQuery) -> QueryPlan {
        let forest = MeasureForest::from_measures(
            "t",
            [
                Measure::aggregator("avg", "k1", Aggregation::Avg),
                Measure::aggregator("sum", "k1", Aggregation::Sum),
            ],
        )
        .unwrap();
        PlanBuilder::new(&forest, &Registry::new())
            .build(&query)
            .unwrap()
    }

    fn column(pairs: Vec<(Slice, MeasureValue)>) -> Arc<SliceColumn> {
        Arc::new(pairs.into_iter().collect())
    }

    #[test]
    fn carriers_are_unwrapped_unless_asked() {
        let plan = plan(CubeQuery::new().measure_refs(["avg"]));
        let values = ValueMap::new();
        let fr = Slice::from_pairs([("country", "FR")]);
        values.insert(
            plan.roots()[0],
            column(vec![(
                fr.clone(),
                MeasureValue::Carrier(Carrier::Avg { sum: 9.0, count: 3 }),
            )]),
        );

        let view = assemble(&plan, &values, false);
        assert_eq!(
            view.get(&fr, "avg"),
            Some(&MeasureValue::Scalar(Scalar::F64(3.0)))
        );

        let view = assemble(&plan, &values, true);
        assert!(view.get(&fr, "avg").unwrap().is_carrier());
    }

    #[test]
    fn empty_roots_become_nulls_and_missing_columns_are_skipped() {
        let plan_empty = plan(CubeQuery::new());
        let values = ValueMap::new();
        let a = Slice::from_pairs([("country", "FR")]);
        let b = Slice::from_pairs([("country", "DE")]);
        values.insert(
            plan_empty.roots()[0],
            column(vec![
                (a.clone(), MeasureValue::Scalar(Scalar::I64(1))),
                (b.clone(), MeasureValue::Scalar(Scalar::I64(2))),
            ]),
        );
        let view = assemble(&plan_empty, &values, false);
        assert_eq!(view.len(), 2);
        assert_eq!(view.get(&a, "$empty"), Some(&MeasureValue::null()));
        let sorted: Vec<&Slice> = view.sorted_rows().into_iter().map(|(s, _)| s).collect();
        assert_eq!(sorted, vec![&b, &a]);

        let plan_sum = plan(CubeQuery::new().measure_refs(["sum"]));
        let view = assemble(&plan_sum, &ValueMap::new(), false);
        assert!(view.is_empty());
    }
}
