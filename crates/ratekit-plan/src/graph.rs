//! Incremental topological scheduling over step names.
//!
//! `TopoSorter` is deliberately execution-agnostic: it hands out names
//! whose upstreams have all completed and is told when each finishes. The
//! sequential runner drains it in one loop; the parallel runner interleaves
//! `get_ready` and `done` as workers report back.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::error::PlanError;

/// Kahn's algorithm, split into prepare / get_ready / done phases.
#[derive(Debug, Clone)]
pub struct TopoSorter {
    /// node -> set of direct upstream nodes
    upstream: IndexMap<String, HashSet<String>>,
    /// node -> remaining unfinished upstream count
    pending: HashMap<String, usize>,
    /// nodes ready but not yet handed out
    ready: Vec<String>,
    handed: HashSet<String>,
    finished: usize,
    prepared: bool,
}

impl TopoSorter {
    pub fn new(upstream: IndexMap<String, HashSet<String>>) -> Self {
        Self {
            upstream,
            pending: HashMap::new(),
            ready: Vec::new(),
            handed: HashSet::new(),
            finished: 0,
            prepared: false,
        }
    }

    /// Seed the ready set and verify the graph is acyclic. A cycle is
    /// detected up front by running the whole sort once on a scratch copy.
    pub fn prepare(&mut self) -> Result<(), PlanError> {
        self.pending.clear();
        self.ready.clear();
        self.handed.clear();
        self.finished = 0;

        for (node, ups) in &self.upstream {
            self.pending.insert(node.clone(), ups.len());
            if ups.is_empty() {
                self.ready.push(node.clone());
            }
        }

        // scratch run of the full sort; whatever it cannot reach is cyclic
        let mut counts = self.pending.clone();
        let mut queue: Vec<String> = self.ready.clone();
        let mut sorted = 0usize;
        while let Some(node) = queue.pop() {
            sorted += 1;
            for (down, ups) in &self.upstream {
                if ups.contains(&node) {
                    let c = counts.entry(down.clone()).or_insert(0);
                    *c -= 1;
                    if *c == 0 {
                        queue.push(down.clone());
                    }
                }
            }
        }
        if sorted != self.upstream.len() {
            let mut stuck: Vec<&str> = counts
                .iter()
                .filter(|(_, &c)| c > 0)
                .map(|(n, _)| n.as_str())
                .collect();
            stuck.sort_unstable();
            return Err(PlanError::Cycle(stuck.join(", ")));
        }
        self.prepared = true;
        Ok(())
    }

    /// True while unfinished nodes remain.
    pub fn is_active(&self) -> bool {
        self.prepared && self.finished < self.upstream.len()
    }

    /// Drain the nodes that are ready and not yet handed out.
    pub fn get_ready(&mut self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.ready.len());
        for node in self.ready.drain(..) {
            if self.handed.insert(node.clone()) {
                out.push(node);
            }
        }
        out
    }

    /// Mark a node finished, releasing its downstreams.
    pub fn done(&mut self, node: &str) {
        self.finished += 1;
        for (down, ups) in &self.upstream {
            if ups.contains(node) {
                if let Some(c) = self.pending.get_mut(down) {
                    *c = c.saturating_sub(1);
                    if *c == 0 && !self.handed.contains(down) {
                        self.ready.push(down.clone());
                    }
                }
            }
        }
    }

    /// One full topological order, for sequential execution.
    pub fn static_order(mut self) -> Result<Vec<String>, PlanError> {
        self.prepare()?;
        let mut order = Vec::with_capacity(self.upstream.len());
        while self.is_active() {
            let batch = self.get_ready();
            for node in batch {
                self.done(&node);
                order.push(node);
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> TopoSorter {
        let mut upstream = IndexMap::new();
        for (node, ups) in edges {
            upstream.insert(
                node.to_string(),
                ups.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            );
        }
        TopoSorter::new(upstream)
    }

    #[test]
    fn static_order_respects_dependencies() {
        let sorter = graph(&[
            ("total", &["base", "surcharge"]),
            ("surcharge", &["base"]),
            ("base", &[]),
        ]);
        let order = sorter.static_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("base") < pos("surcharge"));
        assert!(pos("surcharge") < pos("total"));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn incremental_drain_hands_each_node_once() {
        let mut sorter = graph(&[("b", &["a"]), ("a", &[]), ("c", &["a"])]);
        sorter.prepare().unwrap();

        let first = sorter.get_ready();
        assert_eq!(first, vec!["a"]);
        assert!(sorter.get_ready().is_empty());

        sorter.done("a");
        let mut second = sorter.get_ready();
        second.sort();
        assert_eq!(second, vec!["b", "c"]);

        sorter.done("b");
        sorter.done("c");
        assert!(!sorter.is_active());
    }

    #[test]
    fn cycle_is_reported_with_its_members() {
        let sorter = graph(&[("x", &["y"]), ("y", &["x"]), ("z", &[])]);
        let err = sorter.static_order();
        match err {
            Err(PlanError::Cycle(members)) => {
                assert!(members.contains('x'));
                assert!(members.contains('y'));
                assert!(!members.contains('z'));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn empty_graph_is_trivially_done() {
        let mut sorter = graph(&[]);
        sorter.prepare().unwrap();
        assert!(!sorter.is_active());
    }
}
