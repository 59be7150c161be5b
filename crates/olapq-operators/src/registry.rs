//! Transformator registry.
//!
//! Built-in measure kinds map to their operator directly; `Custom` measures
//! are looked up by key among factories registered at engine setup.

use std::collections::HashMap;
use std::sync::Arc;

use olapq_core::measure::{CustomMeasure, Measure};

use crate::combinator::CombinatorOp;
use crate::filtrator::{FiltratorOp, UnfiltratorOp};
use crate::traits::{OpError, Transformator};

pub type TransformatorFactory =
    Arc<dyn Fn(&CustomMeasure) -> Result<Box<dyn Transformator>, OpError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Registry {
    custom: HashMap<String, TransformatorFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for custom measures with `key`.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn(&CustomMeasure) -> Result<Box<dyn Transformator>, OpError> + Send + Sync + 'static,
    {
        self.custom.insert(key.into(), Arc::new(factory));
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.custom.contains_key(key)
    }

    /// Transformator for a resolved, non-leaf measure.
    pub fn transformator(&self, measure: &Measure) -> Result<Box<dyn Transformator>, OpError> {
        match measure {
            Measure::Combinator(def) => Ok(Box::new(CombinatorOp::new(def.clone()))),
            Measure::Filtrator(def) => Ok(Box::new(FiltratorOp::new(def.clone()))),
            Measure::Unfiltrator(def) => Ok(Box::new(UnfiltratorOp::new(def.clone()))),
            Measure::Custom(def) => {
                let factory = self
                    .custom
                    .get(&def.key)
                    .ok_or_else(|| OpError::UnknownKey(def.key.clone()))?;
                factory(def)
            }
            Measure::Aggregator(_) | Measure::Reference(_) | Measure::Empty => {
                Err(OpError::NotTransformable(measure.name().to_string()))
            }
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.custom.keys().collect();
        keys.sort();
        f.debug_struct("Registry").field("custom", &keys).finish()
    }
}
