use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("table error: {0}")]
    Table(#[from] ratekit_table::TableError),

    #[error("shape error: {0}")]
    Shape(#[from] ratekit_core::CoreError),

    #[error("schema error: {0}")]
    Schema(String),
}
