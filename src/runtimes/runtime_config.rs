use serde::{Deserialize, Serialize};

/// Executor limits for a compiled workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum node executions per run segment before the executor aborts
    /// with a step-limit error. Guards against routing cycles.
    pub step_limit: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { step_limit: 25 }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_step_limit(step_limit: u64) -> Self {
        Self { step_limit }
    }
}
