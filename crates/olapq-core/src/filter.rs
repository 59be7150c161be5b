//! Boolean filters over fact columns.
//!
//! Filters are part of a step's identity, so they are structural values
//! (`Eq + Hash + Ord`). `and`/`or` normalize operands (flatten, sort, dedup)
//! so that logically identical conjunctions built in different orders land
//! on the same plan vertex.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Coordinate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    MatchAll,
    Equals {
        column: String,
        value: Coordinate,
    },
    In {
        column: String,
        values: BTreeSet<Coordinate>,
    },
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn equals(column: impl Into<String>, value: impl Into<Coordinate>) -> Self {
        Filter::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Filter::MatchAll)
    }

    /// Conjunction with `MatchAll` as identity.
    pub fn and(self, other: Filter) -> Filter {
        let mut operands = Vec::new();
        for f in [self, other] {
            match f {
                Filter::MatchAll => {}
                Filter::And(inner) => operands.extend(inner),
                f => operands.push(f),
            }
        }
        operands.sort();
        operands.dedup();
        match operands.len() {
            0 => Filter::MatchAll,
            1 => operands.pop().unwrap_or_default(),
            _ => Filter::And(operands),
        }
    }

    /// Disjunction; `MatchAll` absorbs everything.
    pub fn or(self, other: Filter) -> Filter {
        let mut operands = Vec::new();
        for f in [self, other] {
            match f {
                Filter::MatchAll => return Filter::MatchAll,
                Filter::Or(inner) => operands.extend(inner),
                f => operands.push(f),
            }
        }
        operands.sort();
        operands.dedup();
        match operands.len() {
            1 => operands.pop().unwrap_or_default(),
            _ => Filter::Or(operands),
        }
    }

    /// Evaluate against one row. `lookup` returns the row's coordinate for a
    /// column, `None` when the column does not exist (which never matches).
    pub fn matches(&self, lookup: &dyn Fn(&str) -> Option<Coordinate>) -> bool {
        match self {
            Filter::MatchAll => true,
            Filter::Equals { column, value } => lookup(column).as_ref() == Some(value),
            Filter::In { column, values } => {
                lookup(column).map(|c| values.contains(&c)).unwrap_or(false)
            }
            Filter::Not(inner) => !inner.matches(lookup),
            Filter::And(operands) => operands.iter().all(|f| f.matches(lookup)),
            Filter::Or(operands) => operands.iter().any(|f| f.matches(lookup)),
        }
    }

    /// Columns referenced anywhere in the filter.
    pub fn columns(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            Filter::MatchAll => {}
            Filter::Equals { column, .. } | Filter::In { column, .. } => {
                out.insert(column.clone());
            }
            Filter::Not(inner) => inner.collect_columns(out),
            Filter::And(operands) | Filter::Or(operands) => {
                for f in operands {
                    f.collect_columns(out);
                }
            }
        }
    }

    /// Drop every constraint touching `columns`, widening the filter.
    ///
    /// A negation or disjunction that mentions a dropped column is dropped as
    /// a whole: the result must match at least every row the input matched.
    pub fn without_columns(&self, columns: &BTreeSet<String>) -> Filter {
        match self {
            Filter::MatchAll => Filter::MatchAll,
            Filter::Equals { column, .. } | Filter::In { column, .. } => {
                if columns.contains(column) {
                    Filter::MatchAll
                } else {
                    self.clone()
                }
            }
            Filter::Not(_) | Filter::Or(_) => {
                if self.columns().is_disjoint(columns) {
                    self.clone()
                } else {
                    Filter::MatchAll
                }
            }
            Filter::And(operands) => operands
                .iter()
                .map(|f| f.without_columns(columns))
                .fold(Filter::MatchAll, Filter::and),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::MatchAll => write!(f, "matchAll"),
            Filter::Equals { column, value } => write!(f, "{column}=={value}"),
            Filter::In { column, values } => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{column} in [{}]", rendered.join(","))
            }
            Filter::Not(inner) => write!(f, "!({inner})"),
            Filter::And(operands) => join(f, operands, "&"),
            Filter::Or(operands) => join(f, operands, "|"),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, operands: &[Filter], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, op) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{op}")?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(country: &str) -> impl Fn(&str) -> Option<Coordinate> + '_ {
        move |c: &str| (c == "country").then(|| Coordinate::from(country))
    }

    #[test]
    fn and_is_order_insensitive() {
        let a = Filter::equals("country", "FR");
        let b = Filter::equals("ccy", "EUR");
        assert_eq!(a.clone().and(b.clone()), b.and(a));
        assert_eq!(Filter::MatchAll.and(Filter::MatchAll), Filter::MatchAll);
    }

    #[test]
    fn matches_rows() {
        let f = Filter::equals("country", "FR").or(Filter::equals("country", "DE"));
        assert!(f.matches(&row("FR")));
        assert!(!f.matches(&row("US")));
        assert!(Filter::Not(Box::new(f)).matches(&row("US")));
        assert!(!Filter::equals("missing", "x").matches(&row("FR")));
    }

    #[test]
    fn without_columns_widens() {
        let f = Filter::equals("country", "FR").and(Filter::equals("ccy", "EUR"));
        let dropped: BTreeSet<String> = ["country".to_string()].into();
        assert_eq!(f.without_columns(&dropped), Filter::equals("ccy", "EUR"));

        let or = Filter::equals("country", "FR").or(Filter::equals("ccy", "EUR"));
        assert_eq!(or.without_columns(&dropped), Filter::MatchAll);
    }

    fn from_yaml(src: &str) -> Filter {
        serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(
            src,
        ))
        .unwrap()
    }

    #[test]
    fn deserializes_from_yaml() {
        let f = from_yaml("equals: { column: country, value: FR }");
        assert_eq!(f, Filter::equals("country", "FR"));
        assert!(from_yaml("match_all").is_match_all());

        let nested = from_yaml("or: [{ equals: { column: year, value: 2024 } }, { not: match_all }]");
        assert_eq!(
            nested,
            Filter::Or(vec![
                Filter::equals("year", 2024i64),
                Filter::Not(Box::new(Filter::MatchAll)),
            ])
        );
    }
}
