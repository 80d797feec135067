#![forbid(unsafe_code)]
//! ratekit-exec: run orchestration.
//!
//! An [`Engine`] takes a plan and a book and produces a [`Session`]: the
//! book's frames plus one result frame per completed step. Sequential and
//! parallel execution produce the same session; parallel mode fans ready
//! steps out to a bounded worker pool and fails fast on the first error.

pub mod config;
pub mod error;
pub mod runner;
pub mod session;

pub use config::ExecConfig;
pub use error::RunError;
pub use runner::Engine;
pub use session::Session;
