#![forbid(unsafe_code)]
//! ratekit: a computation-graph engine for table-driven rating.
//!
//! Records come in as keyed frames, rating logic comes in as keyed lookup
//! tables and custom transformations, and the engine derives the
//! dependency graph between the steps and runs them sequentially or on a
//! worker pool. This facade re-exports the public surface of the member
//! crates; the crates themselves are usable individually.

pub use ratekit_core::{Book, Column, CoreError, Frame, KeyAtom, Resolve, Value};
pub use ratekit_exec::{Engine, ExecConfig, RunError, Session};
pub use ratekit_io::{load_table, read_csv_frame, read_csv_table};
pub use ratekit_plan::{
    infer_inputs, CustomFn, EvalCtx, Plan, PlanError, Step, StepError, StepKind, TopoSorter, Var,
};
pub use ratekit_table::{
    from_raw, DimKind, Dimension, InterpolatedTable, KeyCell, KeyedTable, TableError, TableRow,
};
