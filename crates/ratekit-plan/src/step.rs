//! Named transformation steps.
//!
//! A step binds a name to one of three evaluation kinds: a keyed table
//! lookup, an interpolated lookup, or an arbitrary custom transformation.
//! Every step carries its declared inputs and outputs; the plan derives
//! the dependency graph purely from those two lists.

use std::fmt;
use std::sync::Arc;

use ratekit_core::{Column, Frame, Resolve};
use ratekit_table::{InterpolatedTable, KeyedTable};

use crate::ctx::EvalCtx;
use crate::error::StepError;
use crate::probe::infer_inputs;

/// Default recording depth for input inference on custom steps.
pub const DEFAULT_PROBE_DEPTH: usize = 4;

/// A custom transformation: everything it needs comes through the context.
pub type CustomFn = Arc<dyn Fn(&EvalCtx) -> Result<Frame, StepError> + Send + Sync>;

#[derive(Clone)]
pub enum StepKind {
    Table(Arc<KeyedTable>),
    Interp(Arc<InterpolatedTable>),
    Custom(CustomFn),
}

#[derive(Clone)]
pub struct Step {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    kind: StepKind,
}

impl Step {
    /// A step that evaluates a keyed table. Name, inputs, and outputs all
    /// come from the table itself.
    pub fn table(table: KeyedTable) -> Self {
        Self {
            name: table.name().to_string(),
            inputs: table.inputs(),
            outputs: table.outputs().to_vec(),
            kind: StepKind::Table(Arc::new(table)),
        }
    }

    /// A step that evaluates an interpolated table.
    pub fn interpolated(table: InterpolatedTable) -> Self {
        Self {
            name: table.name().to_string(),
            inputs: table.inputs(),
            outputs: table.outputs().to_vec(),
            kind: StepKind::Interp(Arc::new(table)),
        }
    }

    /// A custom step whose inputs are inferred by dry-running `f` against
    /// a recording context. Its single output is its own name.
    pub fn custom(name: impl Into<String>, f: CustomFn) -> Self {
        Self::custom_probed(name, f, DEFAULT_PROBE_DEPTH)
    }

    /// Like [`custom`](Self::custom) with an explicit recording depth.
    pub fn custom_probed(name: impl Into<String>, f: CustomFn, depth_limit: usize) -> Self {
        let name = name.into();
        let inputs = infer_inputs(&f, depth_limit);
        Self {
            outputs: vec![name.clone()],
            name,
            inputs,
            kind: StepKind::Custom(f),
        }
    }

    /// A custom step with explicitly declared inputs and outputs. No
    /// inference runs; the declaration is trusted as-is.
    pub fn custom_with(
        name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
        f: CustomFn,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            kind: StepKind::Custom(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// Evaluate this step against a resolver tier and return its output
    /// frame.
    pub fn evaluate(&self, session: &dyn Resolve) -> Result<Frame, StepError> {
        match &self.kind {
            StepKind::Table(table) => {
                if table.dims().is_empty() {
                    // constant table: one keyless row, broadcast by joins
                    let out = table.lookup_one(&[])?;
                    let columns = table
                        .outputs()
                        .iter()
                        .zip(out)
                        .map(|(name, v)| Column::new(name.clone(), vec![v]))
                        .collect();
                    return Frame::new(columns).map_err(StepError::Unresolved);
                }
                let inputs = session.lookup(&self.inputs)?;
                Ok(table.lookup_batch(&inputs)?)
            }
            StepKind::Interp(table) => {
                let inputs = session.lookup(&self.inputs)?;
                Ok(table.lookup_batch(&inputs)?)
            }
            StepKind::Custom(f) => {
                let ctx = EvalCtx::Live(session);
                f(&ctx)
            }
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field(
                "kind",
                &match &self.kind {
                    StepKind::Table(_) => "table",
                    StepKind::Interp(_) => "interp",
                    StepKind::Custom(_) => "custom",
                },
            )
            .finish()
    }
}
