#![forbid(unsafe_code)]
//! ratekit-table: the keyed lookup/interpolation engine.
//!
//! A [`KeyedTable`] is an immutable table of rows addressed by a composite
//! key whose dimensions are discrete values, closed intervals, or the
//! wildcard sentinel. [`InterpolatedTable`] specializes a single-dimension
//! numeric table into a continuous function with linear interpolation and
//! boundary-slope extrapolation.
//!
//! Tables are built once, validated hard at construction, and never
//! mutated; lookups are pure and read-only.

pub mod error;
pub mod interp;
pub mod keyed;
pub mod raw;

pub use error::{Result, TableError};
pub use interp::InterpolatedTable;
pub use keyed::{DimKind, Dimension, KeyCell, KeyedTable, TableRow};
pub use raw::{from_raw, WILDCARD};
