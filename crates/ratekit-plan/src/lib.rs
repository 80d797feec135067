#![forbid(unsafe_code)]
//! ratekit-plan: steps, dependency inference, and graph construction.
//!
//! A [`Plan`] is the registry of named [`Step`]s. Nothing is wired by the
//! caller: each step declares (or has inferred) the names it reads and the
//! names it writes, and the plan derives a directed acyclic graph from the
//! overlap. The [`TopoSorter`] exposes that graph to the executor with the
//! classic Kahn interface: `prepare`, `is_active`, `get_ready`, `done`.

pub mod ctx;
pub mod error;
pub mod graph;
pub mod plan;
pub mod probe;
pub mod step;

pub use ctx::{EvalCtx, Var};
pub use error::{PlanError, StepError};
pub use graph::TopoSorter;
pub use plan::Plan;
pub use probe::{infer_inputs, ProbeNode};
pub use step::{CustomFn, Step, StepKind};
