//! Columnar frames with named key columns.
//!
//! A `Frame` is an immutable table of named columns, some of which may be
//! designated key columns. Keys are what lets two frames at different
//! granularities be aligned: a driver-level frame keyed on
//! `(policy_id, driver_id)` can absorb a policy-level column keyed on
//! `policy_id` by broadcasting it down. The alignment contract is strict:
//! one frame's key set must be a subset of the other's, otherwise `join`
//! reports a `CoreError::Join`.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::value::{KeyAtom, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An immutable columnar table addressed by zero or more key columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    keys: Vec<String>,
    columns: Vec<Column>,
}

impl Frame {
    /// Build a keyless frame. Columns must be equal length and uniquely named.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let frame = Self {
            keys: Vec::new(),
            columns,
        };
        frame.check_shape()?;
        Ok(frame)
    }

    /// Build a keyed frame. Every key must name an existing column, and key
    /// tuples must be unique across rows.
    pub fn with_keys(columns: Vec<Column>, keys: Vec<String>) -> Result<Self> {
        let frame = Self { keys, columns };
        frame.check_shape()?;
        for k in &frame.keys {
            if frame.column(k).is_none() {
                return Err(CoreError::Shape(format!("key column '{k}' not found")));
            }
        }
        let mut seen: HashSet<Vec<KeyAtom>> = HashSet::with_capacity(frame.num_rows());
        for row in 0..frame.num_rows() {
            if !seen.insert(frame.key_sig(row)) {
                return Err(CoreError::Shape(format!(
                    "duplicate key tuple at row {row} for keys {:?}",
                    frame.keys
                )));
            }
        }
        Ok(frame)
    }

    /// Convenience constructor from `(name, values)` pairs.
    pub fn of(pairs: Vec<(&str, Vec<Value>)>) -> Result<Self> {
        Self::new(
            pairs
                .into_iter()
                .map(|(n, v)| Column::new(n, v))
                .collect(),
        )
    }

    fn check_shape(&self) -> Result<()> {
        let mut names: HashSet<&str> = HashSet::new();
        for c in &self.columns {
            if !names.insert(c.name.as_str()) {
                return Err(CoreError::Shape(format!("duplicate column '{}'", c.name)));
            }
        }
        if let Some(first) = self.columns.first() {
            for c in &self.columns {
                if c.len() != first.len() {
                    return Err(CoreError::Shape(format!(
                        "ragged columns: '{}' has {} rows, '{}' has {}",
                        first.name,
                        first.len(),
                        c.name,
                        c.len()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the non-key (data) columns, in column order.
    pub fn data_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|n| !self.keys.iter().any(|k| k == n))
            .collect()
    }

    /// Single-column view: the named column plus this frame's key columns.
    /// Selecting a key column yields a frame of just the keys.
    pub fn select(&self, name: &str) -> Result<Self> {
        if self.column(name).is_none() {
            return Err(CoreError::Resolve(name.to_string()));
        }
        let columns = self
            .columns
            .iter()
            .filter(|c| c.name == name || self.keys.iter().any(|k| *k == c.name))
            .cloned()
            .collect();
        Ok(Self {
            keys: self.keys.clone(),
            columns,
        })
    }

    /// Key tuple of one row, in key order.
    pub fn key_sig(&self, row: usize) -> Vec<KeyAtom> {
        self.keys
            .iter()
            .map(|k| {
                self.column(k)
                    .map(|c| c.values[row].atom())
                    .unwrap_or(KeyAtom::Null)
            })
            .collect()
    }

    fn sig_over(&self, names: &[String], row: usize) -> Vec<KeyAtom> {
        names
            .iter()
            .map(|k| {
                self.column(k)
                    .map(|c| c.values[row].atom())
                    .unwrap_or(KeyAtom::Null)
            })
            .collect()
    }

    /// Align two frames by key containment and return their union.
    ///
    /// The finer frame (superset key set) decides the row order and the
    /// result's keys; every data column of the coarser frame is broadcast
    /// down by matching on the shared keys, with `Null` for misses. Equal
    /// key sets align row-for-row by full key. Two keyless frames of equal
    /// length align positionally.
    pub fn join(&self, other: &Frame) -> Result<Frame> {
        if self.keys.is_empty() && other.keys.is_empty() {
            if self.num_rows() != other.num_rows() {
                return Err(CoreError::Join(format!(
                    "keyless frames of different lengths ({} vs {})",
                    self.num_rows(),
                    other.num_rows()
                )));
            }
            let mut columns = self.columns.clone();
            for c in &other.columns {
                if self.column(&c.name).is_some() {
                    continue;
                }
                columns.push(c.clone());
            }
            return Frame::new(columns);
        }

        let self_set: BTreeSet<&str> = self.keys.iter().map(|s| s.as_str()).collect();
        let other_set: BTreeSet<&str> = other.keys.iter().map(|s| s.as_str()).collect();

        let (fine, coarse) = if other_set.is_subset(&self_set) {
            (self, other)
        } else if self_set.is_subset(&other_set) {
            (other, self)
        } else {
            return Err(CoreError::Join(format!(
                "key sets {:?} and {:?} are not nested",
                self.keys, other.keys
            )));
        };

        let shared = coarse.keys.clone();
        if shared.is_empty() && coarse.num_rows() != 1 {
            return Err(CoreError::Join(format!(
                "cannot broadcast a keyless frame of {} rows",
                coarse.num_rows()
            )));
        }

        // Index the coarse side by its own keys; first occurrence wins.
        let mut index: HashMap<Vec<KeyAtom>, usize> = HashMap::with_capacity(coarse.num_rows());
        for row in 0..coarse.num_rows() {
            index.entry(coarse.sig_over(&shared, row)).or_insert(row);
        }

        let mut columns = fine.columns.clone();
        for c in &coarse.columns {
            if coarse.keys.iter().any(|k| *k == c.name) || fine.column(&c.name).is_some() {
                continue;
            }
            let mut values = Vec::with_capacity(fine.num_rows());
            for row in 0..fine.num_rows() {
                match index.get(&fine.sig_over(&shared, row)) {
                    Some(&src) => values.push(c.values[src].clone()),
                    None => values.push(Value::Null),
                }
            }
            columns.push(Column::new(c.name.clone(), values));
        }

        Ok(Frame {
            keys: fine.keys.clone(),
            columns,
        })
    }
}
