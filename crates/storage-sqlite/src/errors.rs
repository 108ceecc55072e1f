use formdesk_core::errors::{DatabaseError, Error};
use thiserror::Error;

/// Failures raised by the SQLite layer before they reach the domain.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored payload is invalid: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Stored row is corrupt: {0}")]
    Corrupt(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Query(e) => Error::Database(DatabaseError::QueryFailed(e.to_string())),
            StorageError::Pool(e) => Error::Database(DatabaseError::ConnectionFailed(e.to_string())),
            StorageError::Connection(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::Sqlite(e) => Error::Database(DatabaseError::Internal(e.to_string())),
            StorageError::Payload(e) => Error::Serialization(e),
            StorageError::Corrupt(msg) => Error::Database(DatabaseError::Internal(msg)),
        }
    }
}
