//! Name → measure definitions.

use std::collections::{BTreeMap, BTreeSet};

use olapq_core::measure::{Measure, EMPTY_MEASURE_NAME};

use crate::error::PlanError;

/// Turns references into concrete measures. Non-reference measures resolve
/// to themselves.
pub trait MeasureResolver: Send + Sync {
    fn resolve(&self, measure: &Measure) -> Result<Measure, PlanError>;
}

/// Named measure definitions of one cube. A `Reference` entry acts as an
/// alias for another name.
#[derive(Debug, Clone, Default)]
pub struct MeasureForest {
    name: String,
    measures: BTreeMap<String, Measure>,
}

impl MeasureForest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            measures: BTreeMap::new(),
        }
    }

    /// Build a forest from definitions, rejecting reserved and duplicate names.
    pub fn from_measures(
        name: impl Into<String>,
        measures: impl IntoIterator<Item = Measure>,
    ) -> Result<Self, PlanError> {
        let mut forest = Self::new(name);
        for m in measures {
            forest.add(m)?;
        }
        Ok(forest)
    }

    pub fn add(&mut self, measure: Measure) -> Result<(), PlanError> {
        let name = measure.name().to_string();
        if name == EMPTY_MEASURE_NAME || measure.is_empty_measure() {
            return Err(PlanError::ReservedMeasureName(name));
        }
        if measure.is_reference() {
            return Err(PlanError::BareReference(name));
        }
        if let Some(existing) = self.measures.get(&name) {
            if *existing != measure {
                return Err(PlanError::DuplicateMeasureName {
                    name,
                    first: existing.to_string(),
                    second: measure.to_string(),
                });
            }
            return Ok(());
        }
        self.measures.insert(name, measure);
        Ok(())
    }

    /// Make `alias` resolve to whatever `target` resolves to.
    pub fn add_alias(
        &mut self,
        alias: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<(), PlanError> {
        let alias = alias.into();
        if alias == EMPTY_MEASURE_NAME {
            return Err(PlanError::ReservedMeasureName(alias));
        }
        let target = Measure::reference(target);
        if let Some(existing) = self.measures.get(&alias) {
            if *existing != target {
                return Err(PlanError::DuplicateMeasureName {
                    name: alias,
                    first: existing.to_string(),
                    second: target.to_string(),
                });
            }
            return Ok(());
        }
        self.measures.insert(alias, target);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Measure> {
        self.measures.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.measures.keys()
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }
}

impl MeasureResolver for MeasureForest {
    fn resolve(&self, measure: &Measure) -> Result<Measure, PlanError> {
        let mut current = measure;
        let mut seen = BTreeSet::new();
        while let Measure::Reference(r) = current {
            if !seen.insert(r.name.as_str()) {
                return Err(PlanError::ReferenceLoop(measure.name().to_string()));
            }
            current = self
                .measures
                .get(&r.name)
                .ok_or_else(|| PlanError::UnknownMeasure(r.name.clone()))?;
        }
        Ok(current.clone())
    }
}
