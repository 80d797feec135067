//! Raw-column naming convention.
//!
//! The ingestion collaborator hands the engine named columns; the fixed
//! convention partitions them into dimensions and outputs:
//! - `_name` is a discrete input dimension;
//! - `_name_left` / `_name_right` form one closed interval dimension;
//! - `name_` is an output column;
//! - anything else is dropped.
//!
//! `*` in a discrete column is the wildcard sentinel. In an interval
//! column, `*` maps an end to the matching infinity; a row is a wildcard
//! row only when *both* ends are open, consistent with the convention
//! that one-ended open ranges are real ranges, not wildcards.

use ratekit_core::{Column, Value};

use crate::error::{Result, TableError};
use crate::keyed::{DimKind, Dimension, KeyCell, KeyedTable, TableRow};

/// The reserved wildcard sentinel in raw columns.
pub const WILDCARD: &str = "*";

enum RawDim {
    Discrete(Vec<Value>),
    Interval(Vec<Value>, Vec<Value>),
}

/// Build a [`KeyedTable`] from convention-named raw columns.
pub fn from_raw(name: impl Into<String>, columns: &[Column]) -> Result<KeyedTable> {
    let name = name.into();
    let mut dims: Vec<Dimension> = Vec::new();
    let mut raw_dims: Vec<RawDim> = Vec::new();
    let mut outputs: Vec<String> = Vec::new();
    let mut out_cols: Vec<&Vec<Value>> = Vec::new();

    let find = |suffix_name: &str| -> Option<&Column> {
        columns.iter().find(|c| c.name == suffix_name)
    };

    for c in columns {
        if let Some(stripped) = c.name.strip_prefix('_') {
            if let Some(dim_name) = stripped.strip_suffix("_left") {
                let right = find(&format!("_{dim_name}_right")).ok_or_else(|| {
                    TableError::Construction(format!(
                        "table '{name}': interval input '{dim_name}' is missing '_{dim_name}_right'"
                    ))
                })?;
                dims.push(Dimension::interval(dim_name));
                raw_dims.push(RawDim::Interval(c.values.clone(), right.values.clone()));
            } else if let Some(dim_name) = stripped.strip_suffix("_right") {
                // consumed alongside its _left partner
                if find(&format!("_{dim_name}_left")).is_none() {
                    return Err(TableError::Construction(format!(
                        "table '{name}': interval input '{dim_name}' is missing '_{dim_name}_left'"
                    )));
                }
            } else {
                dims.push(Dimension::discrete(stripped));
                raw_dims.push(RawDim::Discrete(c.values.clone()));
            }
        } else if let Some(out_name) = c.name.strip_suffix('_') {
            outputs.push(out_name.to_string());
            out_cols.push(&c.values);
        }
    }

    let n = columns.first().map(|c| c.values.len()).unwrap_or(0);
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let mut key = Vec::with_capacity(dims.len());
        for (dim, raw) in dims.iter().zip(&raw_dims) {
            key.push(cell_from_raw(&name, dim, raw, i)?);
        }
        let out = out_cols.iter().map(|c| c[i].clone()).collect();
        rows.push(TableRow { key, out });
    }

    KeyedTable::new(name, dims, outputs, rows)
}

fn cell_from_raw(table: &str, dim: &Dimension, raw: &RawDim, row: usize) -> Result<KeyCell> {
    match (dim.kind, raw) {
        (DimKind::Discrete, RawDim::Discrete(values)) => Ok(match &values[row] {
            Value::Str(s) if s == WILDCARD => KeyCell::Wildcard,
            v => KeyCell::Exact(v.clone()),
        }),
        (DimKind::Interval, RawDim::Interval(left, right)) => {
            let l = interval_end(table, dim, &left[row], f64::NEG_INFINITY)?;
            let r = interval_end(table, dim, &right[row], f64::INFINITY)?;
            if l.is_infinite() && r.is_infinite() && l < r {
                Ok(KeyCell::Wildcard)
            } else {
                Ok(KeyCell::Interval(l, r))
            }
        }
        _ => unreachable!("dimension kind always matches its raw column"),
    }
}

fn interval_end(table: &str, dim: &Dimension, v: &Value, open: f64) -> Result<f64> {
    match v {
        Value::Str(s) if s == WILDCARD => Ok(open),
        Value::Null => Ok(open),
        other => other.as_num().ok_or_else(|| {
            TableError::Construction(format!(
                "table '{table}': interval input '{}' has non-numeric bound '{other}'",
                dim.name
            ))
        }),
    }
}
