use olapq_core::error::ErrorKind;
use olapq_operators::OpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("two different measures are both named '{name}': {first} vs {second}")]
    DuplicateMeasureName {
        name: String,
        first: String,
        second: String,
    },

    #[error("measure name '{0}' is reserved")]
    ReservedMeasureName(String),

    #[error("unknown measure '{0}'")]
    UnknownMeasure(String),

    #[error("measure '{0}' refers back to itself through references")]
    ReferenceLoop(String),

    #[error("'{0}' is a bare reference; register it with add_alias")]
    BareReference(String),

    #[error("cycle while adding [{parent}] -> [{child}]: {}", path.join(" -> "))]
    Cycle {
        parent: String,
        child: String,
        path: Vec<String>,
    },

    #[error("measure '{measure}' could not declare underlying steps of [{step}]: {source}")]
    UnderlyingSteps {
        measure: String,
        step: String,
        #[source]
        source: OpError,
    },

    #[error("step [{0}] still holds a reference after planning")]
    UnresolvedReference(String),

    #[error("model file: {0}")]
    Model(#[from] serde_yaml::Error),
}

impl PlanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::DuplicateMeasureName { .. }
            | PlanError::ReservedMeasureName(_)
            | PlanError::UnknownMeasure(_)
            | PlanError::ReferenceLoop(_)
            | PlanError::BareReference(_)
            | PlanError::Model(_) => ErrorKind::Configuration,
            PlanError::Cycle { .. } | PlanError::UnderlyingSteps { .. } => {
                ErrorKind::PlanConstruction
            }
            PlanError::UnresolvedReference(_) => ErrorKind::Consistency,
        }
    }
}
