//! Continuous single-dimension tables.
//!
//! An `InterpolatedTable` flattens a one-dimension numeric [`KeyedTable`]
//! into sorted `(key, outputs)` points and answers queries by linear
//! interpolation between neighbors, extending the boundary slope beyond
//! the stored range instead of failing. Interval keys flatten by their
//! left bound.

use ratekit_core::{Column, Frame, Value};

use crate::error::{Result, TableError};
use crate::keyed::{KeyCell, KeyedTable};

#[derive(Debug, Clone)]
pub struct InterpolatedTable {
    name: String,
    dim: String,
    outputs: Vec<String>,
    /// strictly increasing
    xs: Vec<f64>,
    /// ys[output][point]
    ys: Vec<Vec<f64>>,
}

impl InterpolatedTable {
    /// Flatten a keyed table into interpolation points.
    ///
    /// The source must have exactly one dimension, no wildcard rows, and
    /// numeric keys and outputs; violations are construction failures, not
    /// silent fallbacks.
    pub fn from_table(table: &KeyedTable) -> Result<Self> {
        let name = table.name().to_string();
        if table.dims().len() != 1 {
            return Err(TableError::Construction(format!(
                "interpolated table '{name}' needs exactly one dimension, got {}",
                table.dims().len()
            )));
        }
        if table.has_wildcards() {
            return Err(TableError::Construction(format!(
                "interpolated table '{name}' cannot carry wildcard rows"
            )));
        }
        if table.rows().is_empty() {
            return Err(TableError::Construction(format!(
                "interpolated table '{name}' has no rows"
            )));
        }

        let mut points: Vec<(f64, Vec<f64>)> = Vec::with_capacity(table.rows().len());
        for (i, row) in table.rows().iter().enumerate() {
            let x = match &row.key[0] {
                KeyCell::Exact(v) => v.as_num(),
                KeyCell::Interval(l, _) => Some(*l),
                KeyCell::Wildcard => None,
            }
            .ok_or_else(|| {
                TableError::Construction(format!(
                    "interpolated table '{name}' row {i}: non-numeric key"
                ))
            })?;
            let out = row
                .out
                .iter()
                .map(|v| v.as_num())
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| {
                    TableError::Construction(format!(
                        "interpolated table '{name}' row {i}: non-numeric output"
                    ))
                })?;
            points.push((x, out));
        }

        points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        for pair in points.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(TableError::Construction(format!(
                    "interpolated table '{name}' has duplicate key {}",
                    pair[0].0
                )));
            }
        }

        let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
        let ys: Vec<Vec<f64>> = (0..table.outputs().len())
            .map(|o| points.iter().map(|(_, out)| out[o]).collect())
            .collect();

        Ok(Self {
            name,
            dim: table.dims()[0].name.clone(),
            outputs: table.outputs().to_vec(),
            xs,
            ys,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> Vec<String> {
        vec![self.dim.clone()]
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Interpolated outputs at one query point.
    pub fn lookup_one(&self, x: f64) -> Vec<f64> {
        self.ys.iter().map(|col| interp_at(&self.xs, col, x)).collect()
    }

    /// Batch form of [`lookup_one`](Self::lookup_one); non-numeric query
    /// values yield null outputs, mirroring a keyed-table lookup miss.
    pub fn lookup_batch(&self, inputs: &Frame) -> Result<Frame> {
        let input = inputs.column(&self.dim).ok_or_else(|| {
            TableError::Query(format!(
                "interpolated table '{}' needs input column '{}'",
                self.name, self.dim
            ))
        })?;

        let mut out_cols: Vec<Vec<Value>> =
            vec![Vec::with_capacity(inputs.num_rows()); self.outputs.len()];
        for v in &input.values {
            match v.as_num() {
                Some(x) => {
                    for (col, y) in out_cols.iter_mut().zip(self.lookup_one(x)) {
                        col.push(Value::Num(y));
                    }
                }
                None => {
                    for col in out_cols.iter_mut() {
                        col.push(Value::Null);
                    }
                }
            }
        }

        let mut columns: Vec<Column> = inputs
            .keys()
            .iter()
            .filter_map(|k| inputs.column(k).cloned())
            .collect();
        for (name, values) in self.outputs.iter().zip(out_cols) {
            columns.push(Column::new(name.clone(), values));
        }
        if inputs.keys().is_empty() {
            Frame::new(columns)
        } else {
            Frame::with_keys(columns, inputs.keys().to_vec())
        }
        .map_err(|e| TableError::Query(format!("interpolated table '{}': {e}", self.name)))
    }
}

/// Order-1 interpolation with boundary-slope extrapolation. A single
/// stored point degenerates to a constant.
fn interp_at(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    if n == 1 {
        return ys[0];
    }
    // segment whose right end is the first stored key >= x, clamped so
    // queries outside the range ride the boundary segment's slope
    let hi = xs.partition_point(|&k| k < x).clamp(1, n - 1);
    let lo = hi - 1;
    let slope = (ys[hi] - ys[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + (x - xs[lo]) * slope
}
