pub mod connection;
pub mod rows;

use thiserror::Error;

pub use connection::{ConnectionProvider, ConnectionSettings, PgConnectionProvider, QueryConnection};
pub use rows::Row;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("SQL execution error: {0}")]
    Query(String),
    #[error("Failed to decode column {column}: {message}")]
    Decode { column: String, message: String },
}
