//! Run state: the book plus accumulated step results.
//!
//! Resolution order is results-first: once a step has produced a frame
//! under a name, that frame answers the name for every later step, shadowing
//! any book frame or column of the same name. Results are append-only for
//! the duration of a run.

use std::sync::Arc;

use indexmap::IndexMap;

use ratekit_core::{Book, Frame, Resolve};

#[derive(Debug, Clone)]
pub struct Session {
    book: Arc<Book>,
    results: IndexMap<String, Arc<Frame>>,
}

impl Session {
    pub fn new(book: Arc<Book>) -> Self {
        Self {
            book,
            results: IndexMap::new(),
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Record a step result. The first frame under a name wins; a second
    /// insert under the same name is ignored, which keeps replayed results
    /// from a slow worker harmless.
    pub fn insert(&mut self, name: impl Into<String>, frame: Arc<Frame>) {
        self.results.entry(name.into()).or_insert(frame);
    }

    pub fn result(&self, name: &str) -> Option<&Arc<Frame>> {
        self.results.get(name)
    }

    pub fn result_names(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl Resolve for Session {
    fn get(&self, name: &str) -> Option<Frame> {
        if let Some(frame) = self.results.get(name) {
            return Some(frame.as_ref().clone());
        }
        for frame in self.results.values() {
            if frame.column(name).is_some() {
                return frame.select(name).ok();
            }
        }
        self.book.get(name)
    }
}
