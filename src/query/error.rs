//! Query error types
//!
//! Defines the error conditions that abort a query. Everything else
//! (unknown types, unknown fields, missing endpoints) degrades to an empty
//! or partial result instead.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Query spec could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid time range specified
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Endpoint is not an ISO-8601 instant
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Display timezone is not a known IANA zone
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Parse(err.to_string())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
