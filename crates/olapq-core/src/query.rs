//! Cube queries and their execution options.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::measure::Measure;
use crate::step::GroupBy;

/// Per-query switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOption {
    /// Dump the plan before execution and the step feedback after.
    Explain,
    /// Log every step evaluation and verify the sequential order.
    Debug,
    /// Evaluate the plan with the work-stealing strategy.
    Concurrent,
    /// An unresolvable reference becomes the empty measure instead of an error.
    UnknownMeasuresAreEmpty,
    /// Keep aggregation carriers wrapped in the output view.
    AggregationCarriersStayWrapped,
    /// A failing step yields error values instead of aborting the query.
    ExceptionsAsMeasureValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryOptions(BTreeSet<QueryOption>);

impl QueryOptions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, option: QueryOption) -> Self {
        self.0.insert(option);
        self
    }

    pub fn contains(&self, option: QueryOption) -> bool {
        self.0.contains(&option)
    }

    pub fn iter(&self) -> impl Iterator<Item = QueryOption> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<QueryOption> for QueryOptions {
    fn from_iter<T: IntoIterator<Item = QueryOption>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What the caller asks for: measures over a filtered, grouped cube.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeQuery {
    pub measures: Vec<Measure>,
    pub filter: Filter,
    pub group_by: GroupBy,
    pub custom_marker: Option<String>,
    pub options: QueryOptions,
}

impl CubeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request measures by name; they are resolved against the engine's forest.
    pub fn measure_refs<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.measures
            .extend(names.into_iter().map(|n| Measure::reference(n)));
        self
    }

    pub fn measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = group_by;
        self
    }

    pub fn custom_marker(mut self, marker: impl Into<String>) -> Self {
        self.custom_marker = Some(marker.into());
        self
    }

    pub fn option(mut self, option: QueryOption) -> Self {
        self.options = self.options.with(option);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates() {
        let q = CubeQuery::new()
            .measure_refs(["a", "b"])
            .group_by(GroupBy::of(["country"]))
            .option(QueryOption::Concurrent)
            .option(QueryOption::Explain);
        assert_eq!(q.measures.len(), 2);
        assert!(q.options.contains(QueryOption::Concurrent));
        assert!(!q.options.contains(QueryOption::Debug));
    }

    #[test]
    fn options_parse_from_yaml() {
        let opts: QueryOptions =
            serde_yaml::from_str("[concurrent, unknown_measures_are_empty]").unwrap();
        assert!(opts.contains(QueryOption::UnknownMeasuresAreEmpty));
    }
}
