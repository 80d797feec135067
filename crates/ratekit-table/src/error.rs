use thiserror::Error;

pub type Result<T> = std::result::Result<T, TableError>;

#[derive(Debug, Error)]
pub enum TableError {
    /// Malformed table: duplicate non-wildcard keys, missing interval
    /// partner column, wrong dimension count, zero-input table with more
    /// than one row. Raised at build time, never retried.
    #[error("table construction: {0}")]
    Construction(String),

    /// Malformed query: missing input column, wrong arity, output name
    /// collision. A query that simply matches no row is *not* an error;
    /// it yields null outputs.
    #[error("lookup query: {0}")]
    Query(String),
}
