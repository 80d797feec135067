//! The evaluation context a custom transformation consumes.
//!
//! `EvalCtx` is the one interface custom steps see. In `Live` mode it is
//! backed by a real resolver (book + results); in `Probe` mode it hands
//! out recording placeholders so the same closure can be dry-run for
//! input inference. `Var` is the value handle: a keyed column in live
//! mode, an inert probe node in probe mode, or a deferred fault that
//! surfaces when the result is materialized.

use std::ops::{Add, Div, Mul, Sub};

use ratekit_core::{Column, Frame, Resolve, Value};

use crate::error::StepError;
use crate::probe::ProbeNode;

/// Context handed to a custom step's transformation.
pub enum EvalCtx<'a> {
    Live(&'a dyn Resolve),
    Probe(ProbeNode),
}

impl<'a> EvalCtx<'a> {
    /// Resolve a top-level name to a value handle.
    pub fn get(&self, name: &str) -> Result<Var, StepError> {
        match self {
            EvalCtx::Live(resolver) => resolver
                .get(name)
                .map(Var::Data)
                .ok_or_else(|| StepError::Unresolved(ratekit_core::CoreError::Resolve(name.into()))),
            EvalCtx::Probe(node) => Ok(Var::Probe(node.get(name))),
        }
    }
}

/// A value handle flowing through a custom transformation.
///
/// Arithmetic and comparisons are elementwise over the handle's single
/// data column, aligning operands by the frame join contract (a one-row
/// keyless operand broadcasts). Operations never panic and never return
/// `Result`; problems travel as `Var::Fault` and surface from
/// [`into_frame`](Var::into_frame).
#[derive(Clone)]
pub enum Var {
    Data(Frame),
    Probe(ProbeNode),
    Fault(String),
}

impl Var {
    /// Chained access: a sub-column of a frame handle, or a recorded child
    /// probe.
    pub fn get(&self, name: &str) -> Result<Var, StepError> {
        match self {
            Var::Data(frame) => frame
                .select(name)
                .map(Var::Data)
                .map_err(StepError::Unresolved),
            Var::Probe(node) => Ok(Var::Probe(node.get(name))),
            Var::Fault(msg) => Err(StepError::Custom(msg.clone())),
        }
    }

    /// Materialize the handle as a single-column frame named `name`.
    pub fn into_frame(self, name: &str) -> Result<Frame, StepError> {
        match self {
            Var::Data(frame) => {
                let col = single_data_column(&frame).map_err(StepError::Custom)?;
                let mut columns: Vec<Column> = frame
                    .keys()
                    .iter()
                    .filter_map(|k| frame.column(k).cloned())
                    .collect();
                columns.push(Column::new(name, col.values.clone()));
                let built = if frame.keys().is_empty() {
                    Frame::new(columns)
                } else {
                    Frame::with_keys(columns, frame.keys().to_vec())
                };
                built.map_err(StepError::Unresolved)
            }
            // probe results are discarded by the dry run
            Var::Probe(_) => Frame::new(vec![Column::new(name, vec![])])
                .map_err(StepError::Unresolved),
            Var::Fault(msg) => Err(StepError::Custom(msg)),
        }
    }

    // --- elementwise combinators ---

    fn zip(self, rhs: Var, op: &str, f: impl Fn(&Value, &Value) -> Value) -> Var {
        match (self, rhs) {
            (Var::Probe(p), _) | (_, Var::Probe(p)) => Var::Probe(p),
            (Var::Fault(m), _) | (_, Var::Fault(m)) => Var::Fault(m),
            (Var::Data(a), Var::Data(b)) => match align(&a, &b) {
                Ok((shape, av, bv)) => {
                    let values = av.iter().zip(&bv).map(|(x, y)| f(x, y)).collect();
                    rebuild(shape, values)
                }
                Err(msg) => Var::Fault(format!("{op}: {msg}")),
            },
        }
    }

    fn map(self, f: impl Fn(&Value) -> Value) -> Var {
        match self {
            Var::Data(frame) => {
                let col = match single_data_column(&frame) {
                    Ok(c) => c,
                    Err(msg) => return Var::Fault(msg),
                };
                let values = col.values.iter().map(f).collect();
                rebuild(frame.clone(), values)
            }
            other => other,
        }
    }

    pub fn gt(self, rhs: impl Into<Var>) -> Var {
        self.zip(rhs.into(), "gt", |a, b| cmp_num(a, b, |x, y| x > y))
    }

    pub fn ge(self, rhs: impl Into<Var>) -> Var {
        self.zip(rhs.into(), "ge", |a, b| cmp_num(a, b, |x, y| x >= y))
    }

    pub fn lt(self, rhs: impl Into<Var>) -> Var {
        self.zip(rhs.into(), "lt", |a, b| cmp_num(a, b, |x, y| x < y))
    }

    pub fn le(self, rhs: impl Into<Var>) -> Var {
        self.zip(rhs.into(), "le", |a, b| cmp_num(a, b, |x, y| x <= y))
    }

    /// Elementwise equality against a value or another handle.
    pub fn eq_val(self, rhs: impl Into<Var>) -> Var {
        self.zip(rhs.into(), "eq", |a, b| {
            if a.is_null() || b.is_null() {
                Value::Null
            } else {
                Value::Bool(a.atom() == b.atom())
            }
        })
    }

    pub fn min_with(self, rhs: impl Into<Var>) -> Var {
        self.zip(rhs.into(), "min", |a, b| pick_num(a, b, |x, y| x <= y))
    }

    pub fn max_with(self, rhs: impl Into<Var>) -> Var {
        self.zip(rhs.into(), "max", |a, b| pick_num(a, b, |x, y| x >= y))
    }

    /// Lower bound, like a one-sided clip.
    pub fn clip_min(self, floor: f64) -> Var {
        self.map(move |v| match v.as_num() {
            Some(x) => Value::Num(x.max(floor)),
            None => Value::Null,
        })
    }

    /// Round to `digits` decimal places.
    pub fn round_to(self, digits: u32) -> Var {
        let scale = 10f64.powi(digits as i32);
        self.map(move |v| match v.as_num() {
            Some(x) => Value::Num((x * scale).round() / scale),
            None => Value::Null,
        })
    }

    /// Where/otherwise: treat `self` as a boolean mask and choose
    /// elementwise between the two branches. Null mask entries choose the
    /// `otherwise` branch.
    pub fn select(self, on_true: impl Into<Var>, otherwise: impl Into<Var>) -> Var {
        let picked = self.zip(on_true.into(), "select", |mask, t| {
            if mask.as_bool() == Some(true) {
                t.clone()
            } else {
                Value::Null
            }
        });
        // second pass fills the false/null positions
        match (picked, otherwise.into()) {
            (Var::Probe(p), _) | (_, Var::Probe(p)) => Var::Probe(p),
            (Var::Fault(m), _) | (_, Var::Fault(m)) => Var::Fault(m),
            (Var::Data(a), Var::Data(b)) => match align(&a, &b) {
                Ok((shape, av, bv)) => {
                    let values = av
                        .iter()
                        .zip(&bv)
                        .map(|(x, y)| if x.is_null() { y.clone() } else { x.clone() })
                        .collect();
                    rebuild(shape, values)
                }
                Err(msg) => Var::Fault(format!("select: {msg}")),
            },
        }
    }
}

impl From<f64> for Var {
    fn from(v: f64) -> Self {
        Var::Data(scalar_frame(Value::Num(v)))
    }
}

impl From<Value> for Var {
    fn from(v: Value) -> Self {
        Var::Data(scalar_frame(v))
    }
}

impl Add for Var {
    type Output = Var;
    fn add(self, rhs: Var) -> Var {
        self.zip(rhs, "add", |a, b| arith(a, b, |x, y| x + y))
    }
}

impl Sub for Var {
    type Output = Var;
    fn sub(self, rhs: Var) -> Var {
        self.zip(rhs, "sub", |a, b| arith(a, b, |x, y| x - y))
    }
}

impl Mul for Var {
    type Output = Var;
    fn mul(self, rhs: Var) -> Var {
        self.zip(rhs, "mul", |a, b| arith(a, b, |x, y| x * y))
    }
}

impl Div for Var {
    type Output = Var;
    fn div(self, rhs: Var) -> Var {
        self.zip(rhs, "div", |a, b| arith(a, b, |x, y| x / y))
    }
}

impl Add<f64> for Var {
    type Output = Var;
    fn add(self, rhs: f64) -> Var {
        self + Var::from(rhs)
    }
}

impl Sub<f64> for Var {
    type Output = Var;
    fn sub(self, rhs: f64) -> Var {
        self - Var::from(rhs)
    }
}

impl Mul<f64> for Var {
    type Output = Var;
    fn mul(self, rhs: f64) -> Var {
        self * Var::from(rhs)
    }
}

impl Div<f64> for Var {
    type Output = Var;
    fn div(self, rhs: f64) -> Var {
        self / Var::from(rhs)
    }
}

// --- helpers ---

fn scalar_frame(v: Value) -> Frame {
    // a single one-cell column cannot violate the shape checks
    Frame::new(vec![Column::new("scalar", vec![v])]).unwrap_or_default()
}

fn single_data_column(frame: &Frame) -> Result<&Column, String> {
    let data = frame.data_names();
    match data.as_slice() {
        [only] => frame
            .column(only)
            .ok_or_else(|| format!("data column '{only}' missing")),
        [] => Err("handle has no data column".to_string()),
        many => Err(format!("handle has {} data columns: {:?}", many.len(), many)),
    }
}

fn rebuild(shape: Frame, values: Vec<Value>) -> Var {
    let name = match single_data_column(&shape) {
        Ok(c) => c.name.clone(),
        Err(msg) => return Var::Fault(msg),
    };
    let mut columns: Vec<Column> = shape
        .keys()
        .iter()
        .filter_map(|k| shape.column(k).cloned())
        .collect();
    columns.push(Column::new(name, values));
    let built = if shape.keys().is_empty() {
        Frame::new(columns)
    } else {
        Frame::with_keys(columns, shape.keys().to_vec())
    };
    match built {
        Ok(frame) => Var::Data(frame),
        Err(e) => Var::Fault(e.to_string()),
    }
}

/// Align two single-column frames; returns the shape frame (whose keys and
/// row order the result takes) plus both value vectors in that order.
fn align(a: &Frame, b: &Frame) -> Result<(Frame, Vec<Value>, Vec<Value>), String> {
    let ac = single_data_column(a)?;
    let bc = single_data_column(b)?;

    let a_scalar = a.num_rows() == 1 && a.keys().is_empty();
    let b_scalar = b.num_rows() == 1 && b.keys().is_empty();

    if b_scalar && !a_scalar {
        let bv = vec![bc.values[0].clone(); a.num_rows()];
        return Ok((a.clone(), ac.values.clone(), bv));
    }
    if a_scalar && !b_scalar {
        let av = vec![ac.values[0].clone(); b.num_rows()];
        let shape = relabel(b, &ac.name)?;
        return Ok((shape, av, bc.values.clone()));
    }
    // positional pairing is only sound when neither side carries keys;
    // keyed operands go through the join so rows pair by key value, not
    // by storage order
    if a.keys().is_empty() && b.keys().is_empty() && a.num_rows() == b.num_rows() {
        return Ok((a.clone(), ac.values.clone(), bc.values.clone()));
    }

    // keyed operands: lean on the join contract
    let lhs = relabel(a, "__lhs")?;
    let rhs = relabel(b, "__rhs")?;
    let joined = lhs.join(&rhs).map_err(|e| e.to_string())?;
    let av = joined
        .column("__lhs")
        .ok_or("join dropped left operand")?
        .values
        .clone();
    let bv = joined
        .column("__rhs")
        .ok_or("join dropped right operand")?
        .values
        .clone();
    let mut columns: Vec<Column> = joined
        .keys()
        .iter()
        .filter_map(|k| joined.column(k).cloned())
        .collect();
    columns.push(Column::new(ac.name.clone(), vec![Value::Null; av.len()]));
    let shape = Frame::with_keys(columns, joined.keys().to_vec()).map_err(|e| e.to_string())?;
    Ok((shape, av, bv))
}

fn relabel(f: &Frame, new_name: &str) -> Result<Frame, String> {
    let data_name = f
        .data_names()
        .first()
        .map(|s| s.to_string())
        .unwrap_or_default();
    let columns = f
        .columns()
        .iter()
        .map(|c| {
            if c.name == data_name {
                Column::new(new_name, c.values.clone())
            } else {
                c.clone()
            }
        })
        .collect();
    let built = if f.keys().is_empty() {
        Frame::new(columns)
    } else {
        Frame::with_keys(columns, f.keys().to_vec())
    };
    built.map_err(|e| e.to_string())
}

fn arith(a: &Value, b: &Value, f: impl Fn(f64, f64) -> f64) -> Value {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => Value::Num(f(x, y)),
        _ => Value::Null,
    }
}

fn cmp_num(a: &Value, b: &Value, f: impl Fn(f64, f64) -> bool) -> Value {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => Value::Bool(f(x, y)),
        _ => Value::Null,
    }
}

fn pick_num(a: &Value, b: &Value, keep_left: impl Fn(f64, f64) -> bool) -> Value {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => {
            if keep_left(x, y) {
                a.clone()
            } else {
                b.clone()
            }
        }
        (Some(_), None) => a.clone(),
        (None, Some(_)) => b.clone(),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratekit_core::Book;

    fn ctx_book() -> Book {
        let policies = Frame::with_keys(
            vec![
                Column::new("policy_id", vec![1.into(), 2.into()]),
                Column::new("total_premium", vec![100.0.into(), 200.0.into()]),
                Column::new("fixed_portion", vec![0.5.into(), 0.25.into()]),
            ],
            vec!["policy_id".into()],
        )
        .unwrap();
        let mut book = Book::new();
        book.register("policies", policies);
        book
    }

    #[test]
    fn live_arithmetic_is_elementwise() {
        let book = ctx_book();
        let ctx = EvalCtx::Live(&book);
        let out = (ctx.get("total_premium").unwrap() * ctx.get("fixed_portion").unwrap())
            .into_frame("fixed_premium")
            .unwrap();
        let col = out.column("fixed_premium").unwrap();
        assert_eq!(col.values[0], Value::Num(50.0));
        assert_eq!(col.values[1], Value::Num(50.0));
    }

    #[test]
    fn scalar_broadcast_and_clip() {
        let book = ctx_book();
        let ctx = EvalCtx::Live(&book);
        let out = (ctx.get("total_premium").unwrap() / 1000.0)
            .clip_min(0.15)
            .into_frame("rate")
            .unwrap();
        let col = out.column("rate").unwrap();
        assert_eq!(col.values[0], Value::Num(0.15));
        assert_eq!(col.values[1], Value::Num(0.2));
    }

    #[test]
    fn scalar_frame_on_the_left_broadcasts() {
        let mut book = ctx_book();
        let defaults = Frame::new(vec![Column::new("base_rate", vec![0.15.into()])]).unwrap();
        book.register("defaults", defaults);
        let ctx = EvalCtx::Live(&book);
        let out = (ctx.get("base_rate").unwrap() * ctx.get("total_premium").unwrap())
            .into_frame("levy")
            .unwrap();
        let col = out.column("levy").unwrap();
        assert_eq!(col.values[0], Value::Num(15.0));
        assert_eq!(col.values[1], Value::Num(30.0));
    }

    #[test]
    fn comparisons_and_select() {
        let book = ctx_book();
        let ctx = EvalCtx::Live(&book);
        let mask = ctx.get("total_premium").unwrap().gt(150.0);
        let out = mask
            .select(Value::from("high"), Value::from("low"))
            .into_frame("band")
            .unwrap();
        let col = out.column("band").unwrap();
        assert_eq!(col.values[0], Value::from("low"));
        assert_eq!(col.values[1], Value::from("high"));
    }

    #[test]
    fn keyed_operands_align_by_key_not_row_order() {
        let premiums = Frame::with_keys(
            vec![
                Column::new("policy_id", vec![1.into(), 2.into()]),
                Column::new("premium", vec![100.0.into(), 200.0.into()]),
            ],
            vec!["policy_id".into()],
        )
        .unwrap();
        // same key set, rows stored in the opposite order
        let discounts = Frame::with_keys(
            vec![
                Column::new("policy_id", vec![2.into(), 1.into()]),
                Column::new("discount", vec![20.0.into(), 10.0.into()]),
            ],
            vec!["policy_id".into()],
        )
        .unwrap();
        let mut book = Book::new();
        book.register("premiums", premiums);
        book.register("discounts", discounts);

        let ctx = EvalCtx::Live(&book);
        let out = (ctx.get("premium").unwrap() - ctx.get("discount").unwrap())
            .into_frame("net")
            .unwrap();
        let col = out.column("net").unwrap();
        assert_eq!(col.values[0], Value::Num(90.0));
        assert_eq!(col.values[1], Value::Num(180.0));
    }

    #[test]
    fn missing_name_is_unresolved() {
        let book = ctx_book();
        let ctx = EvalCtx::Live(&book);
        assert!(matches!(
            ctx.get("surcharge"),
            Err(StepError::Unresolved(_))
        ));
    }

    #[test]
    fn faults_surface_at_materialization() {
        let book = ctx_book();
        let ctx = EvalCtx::Live(&book);
        // "policies" resolves to a whole multi-column frame; arithmetic on
        // it is a deferred fault, not a panic
        let bad = ctx.get("policies").unwrap() + 1.0;
        assert!(matches!(bad, Var::Fault(_)));
        assert!(bad.into_frame("x").is_err());
    }
}
