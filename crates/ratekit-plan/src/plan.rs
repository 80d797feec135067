//! The step registry and its derived dependency graph.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use ratekit_table::{InterpolatedTable, KeyedTable};

use crate::error::PlanError;
use crate::graph::TopoSorter;
use crate::step::{CustomFn, Step};

/// A named collection of steps. Order of registration is preserved but
/// carries no scheduling meaning; execution order comes from the graph.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    name: String,
    steps: IndexMap<String, Arc<Step>>,
}

impl Plan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a step. A second step under the same name is rejected;
    /// renaming or removing is out of scope for a plan under construction.
    pub fn register(&mut self, step: Step) -> Result<(), PlanError> {
        let name = step.name().to_string();
        if self.steps.contains_key(&name) {
            return Err(PlanError::DuplicateStep(name));
        }
        self.steps.insert(name, Arc::new(step));
        Ok(())
    }

    pub fn add_table(&mut self, table: KeyedTable) -> Result<(), PlanError> {
        self.register(Step::table(table))
    }

    pub fn add_interpolated(&mut self, table: InterpolatedTable) -> Result<(), PlanError> {
        self.register(Step::interpolated(table))
    }

    pub fn add_custom(&mut self, name: impl Into<String>, f: CustomFn) -> Result<(), PlanError> {
        self.register(Step::custom(name, f))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Step>> {
        self.steps.get(name)
    }

    pub fn steps(&self) -> impl Iterator<Item = &Arc<Step>> {
        self.steps.values()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Derive the dependency graph: step T is upstream of step S when S
    /// reads one of T's outputs (or T's own name). Inputs no step produces
    /// are external and resolve from the book at run time.
    pub fn graph(&self) -> TopoSorter {
        let mut upstream: IndexMap<String, HashSet<String>> = IndexMap::new();
        for (name, step) in &self.steps {
            let mut ups = HashSet::new();
            for input in step.inputs() {
                for (other_name, other) in &self.steps {
                    if other_name == name {
                        continue;
                    }
                    if other_name == input || other.outputs().iter().any(|o| o == input) {
                        ups.insert(other_name.clone());
                    }
                }
            }
            upstream.insert(name.clone(), ups);
        }
        TopoSorter::new(upstream)
    }
}
