#![forbid(unsafe_code)]
//! ratekit-core: shared kernel for the ratekit engine.
//!
//! This crate contains only *pure* types and small helpers: cell values and
//! their hashable key forms, the columnar `Frame`, the `Book` of record
//! frames, and the `Resolve` trait that every name-lookup tier implements.
//! There is **no I/O** and **no threading** here, by design.
//!
//! Crates that use this:
//! - ratekit-table: builds keyed lookup tables out of `Value` columns.
//! - ratekit-plan: resolves step inputs through `Resolve`.
//! - ratekit-exec: layers the results tier over the `Book`.
//! - ratekit-io: parses external files into `Frame`s and raw columns.

pub mod book;
pub mod error;
pub mod frame;
pub mod value;

pub use book::{Book, Resolve};
pub use error::{CoreError, Result};
pub use frame::{Column, Frame};
pub use value::{KeyAtom, Value};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
