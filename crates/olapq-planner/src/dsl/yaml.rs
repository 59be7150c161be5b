//! YAML model files: a measure forest, one query and where the facts live.
//!
//! Example:
//! ```yaml
//! name: sales
//! table:
//!   name: facts
//!   csv: "data/facts.csv"
//! measures:
//!   - { type: aggregator, name: a, column: k1, aggregation: sum }
//!   - { type: aggregator, name: b, column: k2, aggregation: sum }
//!   - { type: combinator, name: c, underlyings: [a, b], combination: max }
//! aliases:
//!   best: c
//! query:
//!   measures: [a, b, c]
//!   group_by: [country]
//!   filter: { equals: { column: year, value: 2024 } }
//!   options: [concurrent]
//! config:
//!   max_parallel_tasks: 4
//! ```
//!
//! Instead of `csv`, a table may carry inline `columns` and `rows`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use olapq_core::config::EngineConfig;
use olapq_core::filter::Filter;
use olapq_core::measure::Measure;
use olapq_core::query::{CubeQuery, QueryOptions};
use olapq_core::step::GroupBy;
use olapq_core::types::Scalar;

use crate::error::PlanError;
use crate::resolver::MeasureForest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default = "default_model_name")]
    pub name: String,
    pub table: TableDef,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub query: QueryDef,
    #[serde(default)]
    pub config: Option<EngineConfig>,
}

fn default_model_name() -> String {
    "model".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    /// CSV path, relative to the current directory.
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Scalar>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDef {
    /// Measure names, resolved through the model's forest.
    pub measures: Vec<String>,
    pub filter: Filter,
    pub group_by: GroupBy,
    pub custom_marker: Option<String>,
    pub options: QueryOptions,
}

impl ModelFile {
    pub fn forest(&self) -> Result<MeasureForest, PlanError> {
        let mut forest = MeasureForest::from_measures(self.name.clone(), self.measures.clone())?;
        for (alias, target) in &self.aliases {
            forest.add_alias(alias.clone(), target.clone())?;
        }
        Ok(forest)
    }

    pub fn cube_query(&self) -> CubeQuery {
        let q = &self.query;
        let mut query = CubeQuery::new()
            .measure_refs(q.measures.iter().cloned())
            .filter(q.filter.clone())
            .group_by(q.group_by.clone());
        if let Some(marker) = &q.custom_marker {
            query = query.custom_marker(marker.clone());
        }
        query.options = q.options.clone();
        query
    }
}

/// Parses a model file. Enums are read in singleton-map form, so a filter is
/// written `{ equals: { column: year, value: 2024 } }` rather than `!equals`.
pub fn parse_yaml_model(yaml_src: &str) -> Result<ModelFile, PlanError> {
    let model: ModelFile = serde_yaml::with::singleton_map_recursive::deserialize(
        serde_yaml::Deserializer::from_str(yaml_src),
    )?;
    tracing::debug!(
        model = %model.name,
        measures = model.measures.len(),
        "parsed model file"
    );
    Ok(model)
}
