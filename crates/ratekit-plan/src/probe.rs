//! Best-effort input inference by symbolic dry run.
//!
//! A [`ProbeNode`] is a capability recorder: it implements the same access
//! surface a custom transformation consumes, but every operation is an
//! inert no-op returning another probe, and every named access appends its
//! full path to a shared log. Running a transformation once against a
//! probe context therefore reveals the top-level names it reads, without
//! a real session and without real data.
//!
//! This is a heuristic, not a guarantee: a function whose control flow
//! branches on concrete values can report a superset or subset of its true
//! inputs. Explicit declaration is the trusted path; inference is the
//! convenience fallback.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use indexmap::IndexSet;

use crate::ctx::EvalCtx;
use crate::step::CustomFn;

type AccessLog = Rc<RefCell<IndexSet<Vec<String>>>>;

/// One node of the recording proxy, rooted at `path` from the session.
#[derive(Clone)]
pub struct ProbeNode {
    accessed: AccessLog,
    path: Vec<String>,
    depth_limit: usize,
}

impl ProbeNode {
    pub(crate) fn root(depth_limit: usize) -> Self {
        Self {
            accessed: Rc::new(RefCell::new(IndexSet::new())),
            path: Vec::new(),
            depth_limit,
        }
    }

    /// Record an access and return a child probe rooted one level deeper.
    /// Past the depth limit the node returns itself without recording, so
    /// incidental deep chains cannot blow up the log.
    pub fn get(&self, name: &str) -> ProbeNode {
        if self.path.len() >= self.depth_limit {
            return self.clone();
        }
        let mut path = self.path.clone();
        path.push(name.to_string());
        self.accessed.borrow_mut().insert(path.clone());
        ProbeNode {
            accessed: Rc::clone(&self.accessed),
            path,
            depth_limit: self.depth_limit,
        }
    }

    fn first_level_names(&self) -> Vec<String> {
        let log = self.accessed.borrow();
        let mut names: Vec<String> = Vec::new();
        for path in log.iter() {
            if let Some(first) = path.first() {
                if !names.iter().any(|n| n == first) {
                    names.push(first.clone());
                }
            }
        }
        names
    }
}

impl std::fmt::Debug for ProbeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeNode").field("path", &self.path).finish()
    }
}

/// Dry-run a custom transformation once and return the ordered set of
/// top-level names it read.
///
/// The run is failure-tolerant: if the transformation errors or panics on
/// the inert placeholders, whatever paths were recorded up to that point
/// are still reported.
pub fn infer_inputs(f: &CustomFn, depth_limit: usize) -> Vec<String> {
    let root = ProbeNode::root(depth_limit);
    let ctx = EvalCtx::Probe(root.clone());
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _ = f(&ctx);
    }));
    if outcome.is_err() {
        tracing::debug!("input inference aborted by panic; reporting partial paths");
    }
    root.first_level_names()
}
