//! Measures that re-evaluate one underlying under a different filter.
//!
//! Both pass the underlying column through unchanged; only the declared
//! underlying step differs from the parent.

use olapq_core::measure::{Filtrator, Measure, Unfiltrator};
use olapq_core::step::Step;
use olapq_core::types::SliceColumn;

use crate::traits::{OpError, Transformator};

/// `underlying` restricted by an extra filter.
pub struct FiltratorOp {
    def: Filtrator,
}

impl FiltratorOp {
    pub fn new(def: Filtrator) -> Self {
        Self { def }
    }
}

impl Transformator for FiltratorOp {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn underlying_steps(&self, step: &Step) -> Result<Vec<Step>, OpError> {
        let filter = step.filter.clone().and(self.def.filter.clone());
        Ok(vec![step
            .with_measure(Measure::reference(self.def.underlying.clone()))
            .with_filter(filter)])
    }

    fn produce_column(
        &self,
        _step: &Step,
        underlyings: &[&SliceColumn],
    ) -> Result<SliceColumn, OpError> {
        single(&self.def.name, underlyings)
    }
}

/// `underlying` with the query filter on some columns lifted, e.g. the
/// denominator of a share-of-total ratio.
pub struct UnfiltratorOp {
    def: Unfiltrator,
}

impl UnfiltratorOp {
    pub fn new(def: Unfiltrator) -> Self {
        Self { def }
    }
}

impl Transformator for UnfiltratorOp {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn underlying_steps(&self, step: &Step) -> Result<Vec<Step>, OpError> {
        let filter = step.filter.without_columns(&self.def.columns);
        Ok(vec![step
            .with_measure(Measure::reference(self.def.underlying.clone()))
            .with_filter(filter)])
    }

    fn produce_column(
        &self,
        _step: &Step,
        underlyings: &[&SliceColumn],
    ) -> Result<SliceColumn, OpError> {
        single(&self.def.name, underlyings)
    }
}

fn single(measure: &str, underlyings: &[&SliceColumn]) -> Result<SliceColumn, OpError> {
    match underlyings {
        [only] => Ok((*only).clone()),
        other => Err(OpError::Exec(format!(
            "'{measure}' expects exactly one underlying column, got {}",
            other.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olapq_core::filter::Filter;
    use olapq_core::step::GroupBy;
    use std::collections::BTreeSet;

    fn parent() -> Step {
        Step::new(
            Measure::reference("x"),
            Filter::equals("country", "FR"),
            GroupBy::of(["city"]),
        )
    }

    #[test]
    fn filtrator_ands_filters() {
        let op = FiltratorOp::new(Filtrator {
            name: "fr_eur".into(),
            underlying: "amount".into(),
            filter: Filter::equals("ccy", "EUR"),
        });
        let steps = op.underlying_steps(&parent()).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(
            steps[0].filter,
            Filter::equals("country", "FR").and(Filter::equals("ccy", "EUR"))
        );
        assert_eq!(steps[0].measure_name(), "amount");
    }

    #[test]
    fn unfiltrator_lifts_columns() {
        let op = UnfiltratorOp::new(Unfiltrator {
            name: "all_countries".into(),
            underlying: "amount".into(),
            columns: BTreeSet::from(["country".to_string()]),
        });
        let steps = op.underlying_steps(&parent()).unwrap();
        assert_eq!(steps[0].filter, Filter::MatchAll);
        assert_eq!(steps[0].group_by, GroupBy::of(["city"]));
    }

    #[test]
    fn passthrough_requires_one_column() {
        let c = SliceColumn::new();
        assert!(single("m", &[&c]).is_ok());
        assert!(single("m", &[&c, &c]).is_err());
    }
}
