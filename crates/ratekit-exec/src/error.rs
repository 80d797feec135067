use thiserror::Error;

use ratekit_plan::{PlanError, StepError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A step failed; the run that contains it is failed as a whole.
    #[error("step '{step}': {source}")]
    Step {
        step: String,
        #[source]
        source: StepError,
    },

    /// The worker pool broke down (channel disconnect, lost worker).
    #[error("scheduler: {0}")]
    Scheduler(String),
}
