//! Failures of the cloud document store adapter.

use formdesk_core::errors::{Error, SyncError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CloudStorageError>;

#[derive(Debug, Error)]
pub enum CloudStorageError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx body that is not the expected JSON shape
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Non-2xx response
    #[error("Cloud store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl CloudStorageError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::MissingCredentials(message.into())
    }

    /// True when the user has to sign in again before the call can succeed.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => matches!(status, 401 | 403),
            Self::MissingCredentials(_) => true,
            _ => false,
        }
    }
}

impl From<CloudStorageError> for Error {
    fn from(err: CloudStorageError) -> Self {
        if err.is_auth_failure() {
            Error::Sync(SyncError::Unauthenticated)
        } else {
            Error::Sync(SyncError::RemoteUnavailable(err.to_string()))
        }
    }
}
