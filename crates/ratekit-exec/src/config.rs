use serde::{Deserialize, Serialize};

/// Engine tuning knobs. The defaults are what the tests and examples run
/// with; everything here is overridable from deserialized config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Worker thread count for parallel runs. `None` sizes the pool to
    /// available parallelism.
    pub workers: Option<usize>,
    /// How long the orchestrator waits on the result queue before
    /// re-checking for newly ready steps.
    pub poll_timeout_ms: u64,
    /// Recording depth for custom-step input inference.
    pub probe_depth: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            workers: None,
            poll_timeout_ms: 25,
            probe_depth: 4,
        }
    }
}
