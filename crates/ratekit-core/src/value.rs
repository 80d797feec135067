//! Cell values and their hashable key forms.
//!
//! `Value` is what lives in a frame or table cell. `KeyAtom` is the
//! normalized representation used wherever a value participates in a
//! composite key: it is `Eq + Hash`, and it folds `Int` and integral `Num`
//! together so that a table keyed on `18` matches a query of `18.0`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, if it has one.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Num(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Normalized key form. NaN normalizes to `Null` so that a NaN query
    /// never silently matches a stored NaN key.
    pub fn atom(&self) -> KeyAtom {
        match self {
            Value::Null => KeyAtom::Null,
            Value::Bool(b) => KeyAtom::Bool(*b),
            Value::Int(i) => {
                // fold into the float atom only when exactly representable,
                // so distinct wide integers keep distinct atoms
                if i.unsigned_abs() <= (1u64 << 53) {
                    KeyAtom::Num(canonical_bits(*i as f64))
                } else {
                    KeyAtom::Int(*i)
                }
            }
            Value::Num(f) => {
                if f.is_nan() {
                    KeyAtom::Null
                } else {
                    KeyAtom::Num(canonical_bits(*f))
                }
            }
            Value::Str(s) => KeyAtom::Str(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Num(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Hashable, normalized key form of a `Value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyAtom {
    Null,
    Bool(bool),
    /// Canonical bit pattern of the numeric value (-0.0 folded into 0.0).
    Num(u64),
    /// Integer too wide to round-trip through f64; kept exact.
    Int(i64),
    Str(String),
}

fn canonical_bits(f: f64) -> u64 {
    // fold -0.0 into 0.0 so the two hash identically
    if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_float_share_an_atom() {
        assert_eq!(Value::Int(18).atom(), Value::Num(18.0).atom());
        assert_ne!(Value::Int(18).atom(), Value::Num(18.5).atom());
    }

    #[test]
    fn negative_zero_folds() {
        assert_eq!(Value::Num(-0.0).atom(), Value::Num(0.0).atom());
    }

    #[test]
    fn nan_never_matches_itself() {
        assert_eq!(Value::Num(f64::NAN).atom(), KeyAtom::Null);
    }

    #[test]
    fn strings_and_bools_are_distinct() {
        assert_ne!(Value::from("true").atom(), Value::Bool(true).atom());
    }

    #[test]
    fn wide_integers_keep_distinct_atoms() {
        // adjacent wide i64 values collapse to the same f64
        assert_eq!((i64::MAX - 1) as f64, i64::MAX as f64);
        assert_ne!(Value::Int(i64::MAX).atom(), Value::Int(i64::MAX - 1).atom());
    }

    #[test]
    fn serde_round_trip() {
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(-3),
            Value::Num(2.5),
            Value::from("east"),
        ];
        let json = serde_json::to_string(&values).unwrap();
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(values, back);
    }
}
