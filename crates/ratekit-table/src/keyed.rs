//! Keyed lookup tables: exact, interval, and wildcard dimensions.
//!
//! Matching semantics:
//! - a discrete cell matches on normalized value equality;
//! - an interval cell `[left, right]` is closed on both ends;
//! - a wildcard cell matches any query value, but only as a fallback:
//!   among rows that match a query, rows with no wildcard cell always win
//!   over rows with one, and remaining ties go to the first row in table
//!   order.
//!
//! The batch path carries a construction-time index over the wildcard-free
//! rows (hash on discrete atoms plus binary search over non-overlapping
//! interval spans). When the index is ill-defined (overlapping interval
//! spans, or an exact cell in an interval dimension) every query degrades
//! to the row-by-row scan over the whole table.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use ratekit_core::{Column, Frame, KeyAtom, Value};

use crate::error::{Result, TableError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimKind {
    Discrete,
    Interval,
}

/// One named axis of a table's composite key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub kind: DimKind,
}

impl Dimension {
    pub fn discrete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DimKind::Discrete,
        }
    }

    pub fn interval(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DimKind::Interval,
        }
    }
}

/// One stored key cell. The wildcard sentinel is its own variant, never a
/// reserved value smuggled through a data column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyCell {
    Exact(Value),
    /// Closed interval `[left, right]`.
    Interval(f64, f64),
    Wildcard,
}

impl KeyCell {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, KeyCell::Wildcard)
    }

    fn matches(&self, query: &Value) -> bool {
        match self {
            // Null and NaN queries never match a stored key, only a wildcard
            KeyCell::Exact(stored) => {
                let q = query.atom();
                q != KeyAtom::Null && stored.atom() == q
            }
            KeyCell::Interval(left, right) => query
                .as_num()
                .map(|x| *left <= x && x <= *right)
                .unwrap_or(false),
            KeyCell::Wildcard => true,
        }
    }

    /// Signature element used for duplicate detection among wildcard-free
    /// rows. Intervals sign by their exact bounds, so two rows with
    /// overlapping but distinct spans are ambiguity, not duplication.
    fn dup_sig(&self) -> (KeyAtom, u64, u64) {
        match self {
            KeyCell::Exact(v) => (v.atom(), 0, 0),
            KeyCell::Interval(l, r) => (KeyAtom::Null, l.to_bits(), r.to_bits()),
            KeyCell::Wildcard => (KeyAtom::Null, u64::MAX, u64::MAX),
        }
    }
}

/// One fully-specified row: a key tuple and its output values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub key: Vec<KeyCell>,
    pub out: Vec<Value>,
}

impl TableRow {
    pub fn new(key: Vec<KeyCell>, out: Vec<Value>) -> Self {
        Self { key, out }
    }
}

/// Index over the wildcard-free rows: per-interval-dimension sorted spans
/// plus a hash from full key signatures to row ids.
#[derive(Debug, Clone)]
struct TableIndex {
    /// dim idx -> sorted, pairwise non-overlapping `(left, right)` spans
    spans: HashMap<usize, Vec<(f64, f64)>>,
    map: HashMap<Vec<KeyAtom>, usize>,
}

/// An immutable table of rows addressed by a composite key.
#[derive(Debug, Clone)]
pub struct KeyedTable {
    name: String,
    dims: Vec<Dimension>,
    outputs: Vec<String>,
    rows: Vec<TableRow>,
    /// version/effective-date/filing-number style metadata, free-form
    info: BTreeMap<String, String>,
    /// row ids with no wildcard cell, in table order
    plain: Vec<usize>,
    /// row ids with at least one wildcard cell, in table order
    fallback: Vec<usize>,
    /// None when overlapping interval spans make the bulk path ill-defined
    index: Option<TableIndex>,
}

impl KeyedTable {
    pub fn new(
        name: impl Into<String>,
        dims: Vec<Dimension>,
        outputs: Vec<String>,
        rows: Vec<TableRow>,
    ) -> Result<Self> {
        let name = name.into();

        if dims.is_empty() && rows.len() > 1 {
            return Err(TableError::Construction(format!(
                "table '{name}' has no input dimensions but {} rows",
                rows.len()
            )));
        }
        {
            let mut seen = HashSet::new();
            for o in &outputs {
                if !seen.insert(o.as_str()) {
                    return Err(TableError::Construction(format!(
                        "table '{name}' declares output '{o}' twice"
                    )));
                }
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.key.len() != dims.len() {
                return Err(TableError::Construction(format!(
                    "table '{name}' row {i} has {} key cells, expected {}",
                    row.key.len(),
                    dims.len()
                )));
            }
            if row.out.len() != outputs.len() {
                return Err(TableError::Construction(format!(
                    "table '{name}' row {i} has {} outputs, expected {}",
                    row.out.len(),
                    outputs.len()
                )));
            }
            for (cell, dim) in row.key.iter().zip(&dims) {
                if matches!(cell, KeyCell::Interval(..)) && dim.kind != DimKind::Interval {
                    return Err(TableError::Construction(format!(
                        "table '{name}' row {i}: interval cell in discrete dimension '{}'",
                        dim.name
                    )));
                }
            }
        }

        let mut plain = Vec::new();
        let mut fallback = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            if row.key.iter().any(KeyCell::is_wildcard) {
                fallback.push(i);
            } else {
                plain.push(i);
            }
        }

        // Duplicate non-wildcard key tuples are an ambiguous table.
        let mut seen = HashSet::with_capacity(plain.len());
        for &i in &plain {
            let sig: Vec<_> = rows[i].key.iter().map(KeyCell::dup_sig).collect();
            if !seen.insert(sig) {
                return Err(TableError::Construction(format!(
                    "table '{name}' has duplicate key tuple at row {i}"
                )));
            }
        }

        let mut table = Self {
            name,
            dims,
            outputs,
            rows,
            info: BTreeMap::new(),
            plain,
            fallback,
            index: None,
        };
        table.index = table.build_index();
        Ok(table)
    }

    /// Attach free-form metadata (version, effective date, filing numbers).
    pub fn with_info(mut self, info: BTreeMap<String, String>) -> Self {
        self.info = info;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// Input names, in dimension order.
    pub fn inputs(&self) -> Vec<String> {
        self.dims.iter().map(|d| d.name.clone()).collect()
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn info(&self) -> &BTreeMap<String, String> {
        &self.info
    }

    pub fn has_wildcards(&self) -> bool {
        !self.fallback.is_empty()
    }

    fn build_index(&self) -> Option<TableIndex> {
        let mut spans: HashMap<usize, Vec<(f64, f64)>> = HashMap::new();
        for (d, dim) in self.dims.iter().enumerate() {
            if dim.kind != DimKind::Interval {
                continue;
            }
            let mut dim_spans: Vec<(f64, f64)> = Vec::new();
            for &i in &self.plain {
                match self.rows[i].key[d] {
                    KeyCell::Interval(l, r) => dim_spans.push((l, r)),
                    // an exact cell in an interval dimension has no span;
                    // the bulk index cannot represent it
                    _ => return None,
                }
            }
            dim_spans.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            dim_spans.dedup();
            for pair in dim_spans.windows(2) {
                // closed intervals overlap when the earlier right reaches
                // the later left
                if pair[0].1 >= pair[1].0 {
                    return None;
                }
            }
            spans.insert(d, dim_spans);
        }

        let mut map = HashMap::with_capacity(self.plain.len());
        for &i in &self.plain {
            let mut sig = Vec::with_capacity(self.dims.len());
            for (d, cell) in self.rows[i].key.iter().enumerate() {
                match cell {
                    KeyCell::Exact(v) => sig.push(v.atom()),
                    KeyCell::Interval(l, _) => {
                        let dim_spans = &spans[&d];
                        match dim_spans.iter().position(|(sl, _)| sl == l) {
                            Some(pos) => sig.push(span_atom(pos)),
                            None => return None,
                        }
                    }
                    KeyCell::Wildcard => unreachable!("plain rows have no wildcards"),
                }
            }
            map.insert(sig, i);
        }
        Some(TableIndex { spans, map })
    }

    /// Probe signature for one query row, or `None` when some dimension
    /// value falls outside every indexed span (a definite index miss).
    fn probe_sig(&self, index: &TableIndex, query: &[Value]) -> Option<Vec<KeyAtom>> {
        let mut sig = Vec::with_capacity(self.dims.len());
        for (d, dim) in self.dims.iter().enumerate() {
            match dim.kind {
                DimKind::Discrete => {
                    let atom = query[d].atom();
                    if atom == KeyAtom::Null {
                        // null/nan queries can only land on wildcard rows
                        return None;
                    }
                    sig.push(atom);
                }
                DimKind::Interval => {
                    let x = query[d].as_num()?;
                    let dim_spans = &index.spans[&d];
                    // rightmost span starting at or before x
                    let pos = dim_spans.partition_point(|(l, _)| *l <= x);
                    if pos == 0 {
                        return None;
                    }
                    let (l, r) = dim_spans[pos - 1];
                    if x < l || x > r {
                        return None;
                    }
                    sig.push(span_atom(pos - 1));
                }
            }
        }
        Some(sig)
    }

    fn null_outputs(&self) -> Vec<Value> {
        vec![Value::Null; self.outputs.len()]
    }

    /// Scan `candidates` in table order and return the first full match.
    fn scan(&self, candidates: &[usize], query: &[Value]) -> Option<&TableRow> {
        candidates
            .iter()
            .map(|&i| &self.rows[i])
            .find(|row| row.key.iter().zip(query).all(|(cell, q)| cell.matches(q)))
    }

    /// Resolve one positional key tuple.
    ///
    /// Wildcard-free matches always outrank wildcard matches; among equally
    /// specific matches the first row in table order wins (genuinely
    /// ambiguous tables are a modeling smell, but the behavior is defined).
    /// No match at all yields all-null outputs.
    pub fn lookup_one(&self, query: &[Value]) -> Result<Vec<Value>> {
        if query.len() != self.dims.len() {
            return Err(TableError::Query(format!(
                "table '{}' takes {} inputs, got {}",
                self.name,
                self.dims.len(),
                query.len()
            )));
        }
        if self.dims.is_empty() {
            return Ok(self
                .rows
                .first()
                .map(|r| r.out.clone())
                .unwrap_or_else(|| self.null_outputs()));
        }
        let hit = self
            .scan(&self.plain, query)
            .or_else(|| self.scan(&self.fallback, query));
        Ok(hit.map(|r| r.out.clone()).unwrap_or_else(|| self.null_outputs()))
    }

    /// Resolve a single named-value bundle (dict shape).
    pub fn lookup_named(&self, bundle: &BTreeMap<String, Value>) -> Result<Vec<Value>> {
        let mut query = Vec::with_capacity(self.dims.len());
        for dim in &self.dims {
            let v = bundle.get(&dim.name).ok_or_else(|| {
                TableError::Query(format!(
                    "table '{}' is missing input '{}'",
                    self.name, dim.name
                ))
            })?;
            query.push(v.clone());
        }
        self.lookup_one(&query)
    }

    /// Resolve a batch of rows, preserving the caller's row order.
    ///
    /// The result carries the input frame's key columns so it can be joined
    /// back downstream, plus one column per declared output.
    pub fn lookup_batch(&self, inputs: &Frame) -> Result<Frame> {
        let n = inputs.num_rows();

        let input_cols: Vec<&Column> = self
            .dims
            .iter()
            .map(|dim| {
                inputs.column(&dim.name).ok_or_else(|| {
                    TableError::Query(format!(
                        "table '{}' needs input column '{}'",
                        self.name, dim.name
                    ))
                })
            })
            .collect::<Result<_>>()?;

        for out in &self.outputs {
            if inputs.keys().iter().any(|k| k == out) {
                return Err(TableError::Query(format!(
                    "table '{}' output '{out}' collides with an input key column",
                    self.name
                )));
            }
        }

        let mut out_cols: Vec<Vec<Value>> = vec![Vec::with_capacity(n); self.outputs.len()];
        let mut query: Vec<Value> = Vec::with_capacity(self.dims.len());

        for row in 0..n {
            query.clear();
            query.extend(input_cols.iter().map(|c| c.values[row].clone()));

            let out = match &self.index {
                Some(index) => {
                    // fast path: direct hit on the wildcard-free index,
                    // else fall back to the wildcard rows only
                    let hit = self
                        .probe_sig(index, &query)
                        .and_then(|sig| index.map.get(&sig))
                        .map(|&i| self.rows[i].out.clone());
                    match hit {
                        Some(out) => out,
                        None => self
                            .scan(&self.fallback, &query)
                            .map(|r| r.out.clone())
                            .unwrap_or_else(|| self.null_outputs()),
                    }
                }
                // ill-defined index: row-by-row over the entire table
                None => self.lookup_one(&query)?,
            };
            for (col, v) in out_cols.iter_mut().zip(out) {
                col.push(v);
            }
        }

        self.assemble(inputs, out_cols)
    }

    fn assemble(&self, inputs: &Frame, out_cols: Vec<Vec<Value>>) -> Result<Frame> {
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
        .map_err(|e| TableError::Query(format!("table '{}': {e}", self.name)))
    }
}

fn span_atom(pos: usize) -> KeyAtom {
    KeyAtom::Num((pos as f64).to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn age_interval_table() -> KeyedTable {
        // {age in [18,19] -> 1.8, age in [20,21] -> 2.0, * -> 3.0}
        KeyedTable::new(
            "age_factor",
            vec![Dimension::interval("age")],
            vec!["factor".into()],
            vec![
                TableRow {
                    key: vec![KeyCell::Interval(18.0, 19.0)],
                    out: vec![Value::Num(1.8)],
                },
                TableRow {
                    key: vec![KeyCell::Interval(20.0, 21.0)],
                    out: vec![Value::Num(2.0)],
                },
                TableRow {
                    key: vec![KeyCell::Wildcard],
                    out: vec![Value::Num(3.0)],
                },
            ],
        )
        .unwrap()
    }

    fn tier_table() -> KeyedTable {
        KeyedTable::new(
            "tier_factor",
            vec![Dimension::discrete("credit_tier")],
            vec!["factor".into()],
            vec![
                TableRow {
                    key: vec![KeyCell::Exact("A1".into())],
                    out: vec![Value::Num(1.0)],
                },
                TableRow {
                    key: vec![KeyCell::Exact("E1".into())],
                    out: vec![Value::Num(1.8)],
                },
                TableRow {
                    key: vec![KeyCell::Wildcard],
                    out: vec![Value::Num(2.0)],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn interval_match_and_wildcard_fallback() {
        let t = age_interval_table();
        assert_eq!(t.lookup_one(&[19.into()]).unwrap(), vec![Value::Num(1.8)]);
        assert_eq!(t.lookup_one(&[50.into()]).unwrap(), vec![Value::Num(3.0)]);
    }

    #[test]
    fn interval_is_closed_on_both_ends() {
        let t = age_interval_table();
        assert_eq!(t.lookup_one(&[Value::Num(18.0)]).unwrap(), vec![Value::Num(1.8)]);
        assert_eq!(t.lookup_one(&[Value::Num(19.0)]).unwrap(), vec![Value::Num(1.8)]);
        // just past the right end falls through to the wildcard
        assert_eq!(
            t.lookup_one(&[Value::Num(19.5)]).unwrap(),
            vec![Value::Num(3.0)]
        );
    }

    #[test]
    fn specific_match_beats_wildcard_regardless_of_row_order() {
        let t = KeyedTable::new(
            "t",
            vec![Dimension::discrete("tier")],
            vec!["f".into()],
            vec![
                TableRow {
                    key: vec![KeyCell::Wildcard],
                    out: vec![Value::Num(9.0)],
                },
                TableRow {
                    key: vec![KeyCell::Exact("A1".into())],
                    out: vec![Value::Num(1.0)],
                },
            ],
        )
        .unwrap();
        assert_eq!(t.lookup_one(&["A1".into()]).unwrap(), vec![Value::Num(1.0)]);
        assert_eq!(t.lookup_one(&["Z9".into()]).unwrap(), vec![Value::Num(9.0)]);
    }

    #[test]
    fn no_match_is_null_not_error() {
        let t = KeyedTable::new(
            "t",
            vec![Dimension::discrete("tier")],
            vec!["f".into()],
            vec![TableRow {
                key: vec![KeyCell::Exact("A1".into())],
                out: vec![Value::Num(1.0)],
            }],
        )
        .unwrap();
        assert_eq!(t.lookup_one(&["B2".into()]).unwrap(), vec![Value::Null]);
    }

    #[test]
    fn duplicate_plain_keys_are_rejected() {
        let err = KeyedTable::new(
            "t",
            vec![Dimension::discrete("tier")],
            vec!["f".into()],
            vec![
                TableRow {
                    key: vec![KeyCell::Exact("A1".into())],
                    out: vec![Value::Num(1.0)],
                },
                TableRow {
                    key: vec![KeyCell::Exact("A1".into())],
                    out: vec![Value::Num(2.0)],
                },
            ],
        );
        assert!(matches!(err, Err(TableError::Construction(_))));
    }

    #[test]
    fn duplicate_wildcard_rows_are_tolerated() {
        // wildcard rows are exempt from the uniqueness check; first wins
        let t = KeyedTable::new(
            "t",
            vec![Dimension::discrete("tier")],
            vec!["f".into()],
            vec![
                TableRow {
                    key: vec![KeyCell::Wildcard],
                    out: vec![Value::Num(1.0)],
                },
                TableRow {
                    key: vec![KeyCell::Wildcard],
                    out: vec![Value::Num(2.0)],
                },
            ],
        )
        .unwrap();
        assert_eq!(t.lookup_one(&["X".into()]).unwrap(), vec![Value::Num(1.0)]);
    }

    #[test]
    fn zero_dimension_table_is_a_constant() {
        let t = KeyedTable::new(
            "base_rate",
            vec![],
            vec!["rate".into()],
            vec![TableRow {
                key: vec![],
                out: vec![Value::Num(340.0)],
            }],
        )
        .unwrap();
        assert_eq!(t.lookup_one(&[]).unwrap(), vec![Value::Num(340.0)]);

        let err = KeyedTable::new(
            "bad",
            vec![],
            vec!["rate".into()],
            vec![
                TableRow {
                    key: vec![],
                    out: vec![Value::Num(1.0)],
                },
                TableRow {
                    key: vec![],
                    out: vec![Value::Num(2.0)],
                },
            ],
        );
        assert!(matches!(err, Err(TableError::Construction(_))));
    }

    #[test]
    fn mixed_numeric_types_normalize() {
        let t = KeyedTable::new(
            "t",
            vec![Dimension::discrete("age")],
            vec!["f".into()],
            vec![TableRow {
                key: vec![KeyCell::Exact(Value::Int(18))],
                out: vec![Value::Num(1.8)],
            }],
        )
        .unwrap();
        assert_eq!(
            t.lookup_one(&[Value::Num(18.0)]).unwrap(),
            vec![Value::Num(1.8)]
        );
    }

    #[test]
    fn batch_matches_row_by_row_with_index() {
        let t = age_interval_table();
        let inputs = Frame::of(vec![(
            "age",
            vec![19.into(), 50.into(), 18.into(), Value::Null],
        )])
        .unwrap();
        let out = t.lookup_batch(&inputs).unwrap();
        let f = out.column("factor").unwrap();
        assert_eq!(f.values[0], Value::Num(1.8));
        assert_eq!(f.values[1], Value::Num(3.0));
        assert_eq!(f.values[2], Value::Num(1.8));
        // null query only matches the wildcard row
        assert_eq!(f.values[3], Value::Num(3.0));
    }

    #[test]
    fn overlapping_spans_degrade_to_full_scan() {
        let t = KeyedTable::new(
            "t",
            vec![Dimension::interval("age")],
            vec!["f".into()],
            vec![
                TableRow {
                    key: vec![KeyCell::Interval(18.0, 25.0)],
                    out: vec![Value::Num(1.0)],
                },
                TableRow {
                    key: vec![KeyCell::Interval(20.0, 30.0)],
                    out: vec![Value::Num(2.0)],
                },
            ],
        )
        .unwrap();
        assert!(t.index.is_none());
        let inputs = Frame::of(vec![("age", vec![22.into(), 28.into()])]).unwrap();
        let out = t.lookup_batch(&inputs).unwrap();
        let f = out.column("f").unwrap();
        // first row in table order wins the overlap
        assert_eq!(f.values[0], Value::Num(1.0));
        assert_eq!(f.values[1], Value::Num(2.0));
    }

    #[test]
    fn exact_cell_in_interval_dimension_disables_the_index() {
        let t = KeyedTable::new(
            "t",
            vec![Dimension::interval("age")],
            vec!["f".into()],
            vec![
                TableRow {
                    key: vec![KeyCell::Interval(18.0, 19.0)],
                    out: vec![Value::Num(1.8)],
                },
                TableRow {
                    key: vec![KeyCell::Exact(30.into())],
                    out: vec![Value::Num(3.0)],
                },
            ],
        )
        .unwrap();
        assert!(t.index.is_none());

        // batch and pointwise must agree on the exact-cell row
        let inputs = Frame::of(vec![("age", vec![30.into(), 19.into()])]).unwrap();
        let out = t.lookup_batch(&inputs).unwrap();
        let f = out.column("f").unwrap();
        assert_eq!(f.values[0], Value::Num(3.0));
        assert_eq!(f.values[1], Value::Num(1.8));
        assert_eq!(t.lookup_one(&[30.into()]).unwrap(), vec![Value::Num(3.0)]);
    }

    #[test]
    fn batch_preserves_caller_key_columns() {
        let t = tier_table();
        let inputs = Frame::with_keys(
            vec![
                Column::new("policy_id", vec![10.into(), 11.into()]),
                Column::new("credit_tier", vec!["E1".into(), "F9".into()]),
            ],
            vec!["policy_id".into()],
        )
        .unwrap();
        let out = t.lookup_batch(&inputs).unwrap();
        assert_eq!(out.keys(), &["policy_id"]);
        let f = out.column("factor").unwrap();
        assert_eq!(f.values[0], Value::Num(1.8));
        assert_eq!(f.values[1], Value::Num(2.0));
    }

    #[test]
    fn named_bundle_lookup() {
        let t = tier_table();
        let mut bundle = BTreeMap::new();
        bundle.insert("credit_tier".to_string(), Value::from("A1"));
        assert_eq!(t.lookup_named(&bundle).unwrap(), vec![Value::Num(1.0)]);
    }
}
