#![forbid(unsafe_code)]
//! ratekit-io: ingestion adapters.
//!
//! CSV in, frames and tables out. Table files use the raw column naming
//! convention (`_name`, `_name_left`/`_name_right`, trailing-underscore
//! outputs) and go through the table crate's raw constructor; record files
//! are plain columns loaded into a keyed `Frame`.

pub mod error;
pub mod readers;

pub use error::{Error, Result};
pub use readers::csv::{load_table, read_csv_frame, read_csv_table};
