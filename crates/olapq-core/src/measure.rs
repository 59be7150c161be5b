//! Measure definitions.
//!
//! A measure is pure data: what to compute, not how. Leaf measures
//! (`Aggregator`, `Empty`) are fed by a leaf source; every other kind is
//! turned into a `Transformator` by `olapq-operators`, which declares the
//! underlying steps and combines their columns. `Reference` is a by-name
//! pointer the planner resolves before a measure may enter a plan.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::Filter;

/// Name of the synthetic measure used to enumerate coordinates when a query
/// asks for no real measure. Reserved: users may not request it by name.
pub const EMPTY_MEASURE_NAME: &str = "$empty";

/// Leaf aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Count,
    Sum,
    /// Produces a `Carrier::Avg`; unwrapped at the output boundary.
    Avg,
    Min,
    Max,
}

/// How a combinator folds its underlying values for one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combination {
    Sum,
    Max,
    Min,
    Product,
    /// First underlying minus the others.
    Difference,
    /// First underlying divided by the second. Division by zero yields null.
    Ratio,
    /// First non-null underlying.
    Coalesce,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Aggregator {
    pub name: String,
    pub column: String,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Combinator {
    pub name: String,
    pub underlyings: Vec<String>,
    pub combination: Combination,
}

/// Evaluates `underlying` under the parent filter AND `filter`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Filtrator {
    pub name: String,
    pub underlying: String,
    pub filter: Filter,
}

/// Evaluates `underlying` with the filter on `columns` removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Unfiltrator {
    pub name: String,
    pub underlying: String,
    pub columns: BTreeSet<String>,
}

/// Measure whose algebra is registered at runtime under `key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomMeasure {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub underlyings: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeasureRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Measure {
    Aggregator(Aggregator),
    Combinator(Combinator),
    Filtrator(Filtrator),
    Unfiltrator(Unfiltrator),
    Custom(CustomMeasure),
    Reference(MeasureRef),
    Empty,
}

impl Measure {
    pub fn reference(name: impl Into<String>) -> Self {
        Measure::Reference(MeasureRef { name: name.into() })
    }

    pub fn aggregator(
        name: impl Into<String>,
        column: impl Into<String>,
        aggregation: Aggregation,
    ) -> Self {
        Measure::Aggregator(Aggregator {
            name: name.into(),
            column: column.into(),
            aggregation,
        })
    }

    pub fn combinator<S: Into<String>>(
        name: impl Into<String>,
        underlyings: impl IntoIterator<Item = S>,
        combination: Combination,
    ) -> Self {
        Measure::Combinator(Combinator {
            name: name.into(),
            underlyings: underlyings.into_iter().map(Into::into).collect(),
            combination,
        })
    }

    pub fn filtrator(
        name: impl Into<String>,
        underlying: impl Into<String>,
        filter: Filter,
    ) -> Self {
        Measure::Filtrator(Filtrator {
            name: name.into(),
            underlying: underlying.into(),
            filter,
        })
    }

    /// Output name of the measure (the column header in the tabular view).
    pub fn name(&self) -> &str {
        match self {
            Measure::Aggregator(m) => &m.name,
            Measure::Combinator(m) => &m.name,
            Measure::Filtrator(m) => &m.name,
            Measure::Unfiltrator(m) => &m.name,
            Measure::Custom(m) => &m.name,
            Measure::Reference(m) => &m.name,
            Measure::Empty => EMPTY_MEASURE_NAME,
        }
    }

    /// Leaves have no underlying measures and are fed by a leaf source.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Measure::Aggregator(_) | Measure::Empty)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Measure::Reference(_))
    }

    pub fn is_empty_measure(&self) -> bool {
        matches!(self, Measure::Empty)
    }

    /// Short kind label used in explain output.
    pub fn kind(&self) -> &'static str {
        match self {
            Measure::Aggregator(_) => "aggregator",
            Measure::Combinator(_) => "combinator",
            Measure::Filtrator(_) => "filtrator",
            Measure::Unfiltrator(_) => "unfiltrator",
            Measure::Custom(_) => "custom",
            Measure::Reference(_) => "reference",
            Measure::Empty => "empty",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Aggregator(a) => {
                write!(f, "{}={:?}({})", a.name, a.aggregation, a.column)
            }
            Measure::Reference(r) => write!(f, "ref({})", r.name),
            other => write!(f, "{}[{}]", other.name(), other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_and_references() {
        assert!(Measure::aggregator("a", "k1", Aggregation::Sum).is_leaf());
        assert!(Measure::Empty.is_leaf());
        assert!(!Measure::combinator("c", ["a", "b"], Combination::Max).is_leaf());
        assert!(Measure::reference("a").is_reference());
        assert_eq!(Measure::Empty.name(), EMPTY_MEASURE_NAME);
    }

    #[test]
    fn parses_tagged_yaml() {
        let yaml = r#"
- type: aggregator
  name: a
  column: k1
  aggregation: sum
- type: combinator
  name: c
  underlyings: [a, b]
  combination: max
- type: custom
  name: x
  key: my_algebra
"#;
        let measures: Vec<Measure> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(measures[0], Measure::aggregator("a", "k1", Aggregation::Sum));
        assert_eq!(
            measures[1],
            Measure::combinator("c", ["a", "b"], Combination::Max)
        );
        assert!(matches!(&measures[2], Measure::Custom(c) if c.params.is_empty()));
    }
}
