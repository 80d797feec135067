use thiserror::Error;

use ratekit_core::CoreError;
use ratekit_table::TableError;

#[derive(Debug, Error)]
pub enum PlanError {
    /// The step dependency graph is not acyclic. Fatal at graph-build time.
    #[error("dependency cycle among steps: {0}")]
    Cycle(String),

    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("step '{0}' is already registered")]
    DuplicateStep(String),
}

/// Failure of a single step's evaluation. Fatal for the run that contains
/// it; transported through the result queue in parallel mode.
#[derive(Debug, Error)]
pub enum StepError {
    /// A declared input exists in neither the book nor the results tier.
    #[error("unresolved input: {0}")]
    Unresolved(#[from] CoreError),

    #[error("table lookup: {0}")]
    Table(#[from] TableError),

    /// A custom transformation reported an error.
    #[error("{0}")]
    Custom(String),

    /// A custom transformation panicked; the payload text is preserved.
    #[error("panicked: {0}")]
    Panicked(String),
}
