//! Plan vertices.
//!
//! A `Step` is one measure evaluated at one filter / group-by / marker
//! combination. Steps compare structurally: two requests for the same tuple
//! are the same vertex.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::measure::Measure;

/// Columns the output is grouped by. Empty means grand total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupBy(BTreeSet<String>);

impl GroupBy {
    pub fn grand_total() -> Self {
        Self::default()
    }

    pub fn of<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self(columns.into_iter().map(Into::into).collect())
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols: Vec<&str> = self.0.iter().map(String::as_str).collect();
        write!(f, "[{}]", cols.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub measure: Measure,
    pub filter: Filter,
    pub group_by: GroupBy,
    /// Opaque caller tag carried down to every underlying step.
    pub custom_marker: Option<String>,
}

impl Step {
    pub fn new(measure: Measure, filter: Filter, group_by: GroupBy) -> Self {
        Self {
            measure,
            filter,
            group_by,
            custom_marker: None,
        }
    }

    pub fn with_custom_marker(mut self, marker: Option<String>) -> Self {
        self.custom_marker = marker;
        self
    }

    /// Same context (filter, group-by, marker), different measure.
    pub fn with_measure(&self, measure: Measure) -> Self {
        Self {
            measure,
            filter: self.filter.clone(),
            group_by: self.group_by.clone(),
            custom_marker: self.custom_marker.clone(),
        }
    }

    /// Same measure and context, different filter.
    pub fn with_filter(&self, filter: Filter) -> Self {
        Self {
            filter,
            ..self.clone()
        }
    }

    pub fn measure_name(&self) -> &str {
        self.measure.name()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m={} filter={} groupBy={}",
            self.measure, self.filter, self.group_by
        )?;
        if let Some(marker) = &self.custom_marker {
            write!(f, " custom={marker}")?;
        }
        Ok(())
    }
}
