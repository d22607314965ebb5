// Bulk data utilities: the fixed three-table schema, a seeded sample
// generator and the CSV loader that fills PostgreSQL from its output.
pub mod csv;
pub mod records;
pub mod sample;
pub mod schema;

use std::path::PathBuf;

use thiserror::Error;

use crate::db::DbError;

pub const CUSTOMERS_FILE: &str = "customers.csv";
pub const ITEMS_FILE: &str = "items.csv";
pub const ORDERS_FILE: &str = "orders.csv";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Cannot read {path}: {source}")]
    MissingFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        source: ::csv::Error,
    },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DbError> for IngestError {
    fn from(err: DbError) -> Self {
        IngestError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        IngestError::DatabaseError(err.to_string())
    }
}
