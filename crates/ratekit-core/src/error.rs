use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A requested name exists in no tier (book frame, column, or result).
    #[error("cannot resolve '{0}'")]
    Resolve(String),

    /// Two frames could not be aligned: neither key set contains the other.
    #[error("incompatible keys: {0}")]
    Join(String),

    /// Malformed frame: ragged columns, unknown key column, duplicate keys.
    #[error("frame shape error: {0}")]
    Shape(String),
}
