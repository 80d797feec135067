//! The book of record frames and the name-resolution contract.
//!
//! A `Book` holds the external data for a run: one frame per record kind
//! (policies, drivers, vehicles, ...), fixed for the whole run. Resolution
//! is an explicit, ordered contract rather than duck-typed recursion: every
//! tier that can answer a name implements [`Resolve`], and composite
//! lookups are built from single-name gets plus the frame join contract.

use indexmap::IndexMap;

use crate::error::{CoreError, Result};
use crate::frame::Frame;

/// A tier that can resolve a name to a frame.
///
/// `get` answers a single name: a whole frame by its registered name, or a
/// single-column view from whichever frame owns a column of that name.
/// `lookup` is the composite contract for cross-table resolution:
/// names are fetched one by one and joined, and each newly joined item's
/// key set must be a subset or superset of the keys accumulated so far.
pub trait Resolve {
    fn get(&self, name: &str) -> Option<Frame>;

    fn lookup(&self, names: &[String]) -> Result<Frame> {
        let mut joined: Option<Frame> = None;
        let mut seen: Vec<&str> = Vec::with_capacity(names.len());
        for name in names {
            if seen.contains(&name.as_str()) {
                continue;
            }
            seen.push(name);
            let item = self
                .get(name)
                .ok_or_else(|| CoreError::Resolve(name.clone()))?;
            joined = Some(match joined {
                None => item,
                Some(acc) => acc.join(&item)?,
            });
        }
        joined.ok_or_else(|| CoreError::Resolve("<empty name list>".to_string()))
    }
}

/// External record frames, registered by name in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Book {
    frames: IndexMap<String, Frame>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame under a name. Re-registering a name replaces it.
    pub fn register(&mut self, name: impl Into<String>, frame: Frame) {
        self.frames.insert(name.into(), frame);
    }

    pub fn frame(&self, name: &str) -> Option<&Frame> {
        self.frames.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Resolve for Book {
    fn get(&self, name: &str) -> Option<Frame> {
        // a frame registered under the name wins outright
        if let Some(frame) = self.frames.get(name) {
            return Some(frame.clone());
        }
        // otherwise scan frames in insertion order for a column of that
        // name; key columns are searchable too
        for frame in self.frames.values() {
            if frame.column(name).is_some() {
                return frame.select(name).ok();
            }
        }
        None
    }
}
