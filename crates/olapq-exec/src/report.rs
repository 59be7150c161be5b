//! Per-query provenance: what ran, how, and what each step cost.

use serde::{Deserialize, Serialize};

use olapq_core::hash::Hash256;
use olapq_core::id::{QueryId, StepId};
use olapq_planner::QueryPlan;

use crate::scheduler::Strategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReport {
    pub id: QueryId,

    /// Stable hash of the plan shape; equal plans hash equal across runs.
    pub plan_hash: Hash256,

    pub engine_version: String,
    pub strategy: Strategy,
    pub steps: usize,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,

    pub feedback: Vec<StepReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: StepId,
    pub measure: String,
    pub size: usize,
    pub duration_us: u64,
}

impl QueryReport {
    pub fn new(id: QueryId, plan_hash: Hash256, strategy: Strategy, started_ms: u64) -> Self {
        Self {
            id,
            plan_hash,
            engine_version: olapq_core::VERSION.to_string(),
            strategy,
            steps: 0,
            started_ms,
            finished_ms: started_ms,
            feedback: Vec::new(),
        }
    }

    /// Copy the plan's recorded feedback and stamp the finish time.
    pub fn finish(mut self, plan: &QueryPlan, finished_ms: u64) -> Self {
        self.steps = plan.len();
        self.finished_ms = finished_ms;
        self.feedback = plan
            .feedback_entries()
            .into_iter()
            .map(|(id, fb)| StepReport {
                step: id,
                measure: plan.step(id).measure_name().to_string(),
                size: fb.size,
                duration_us: fb.duration.as_micros() as u64,
            })
            .collect();
        self
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
