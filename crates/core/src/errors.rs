//! Error taxonomy shared by every FormDesk crate.

use thiserror::Error;

use crate::documents::{FormType, Tier};

/// Result type alias used throughout the domain layer.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The local store could not be reached or a transaction failed.
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// A tier move found no document at its source.
    #[error("Cannot move {form_type}/{id}: document is not in the {from} tier")]
    TransitionConflict {
        form_type: FormType,
        id: String,
        from: Tier,
    },

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create connection pool: {0}")]
    PoolCreationFailed(String),

    #[error("Failed to run migrations: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Database error: {0}")]
    Internal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Not signed in to cloud storage")]
    Unauthenticated,

    #[error("Cloud storage unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("A sync operation for {0} is already in progress")]
    AlreadyInProgress(FormType),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Document {0} is read-only; move it to the workspace before editing")]
    ReadOnlyDocument(String),

    #[error("No document is active")]
    NoActiveDocument,

    #[error("No form type is selected")]
    NoFormSelected,

    #[error("Document {id} is not in the {form_type} workspace")]
    NotInWorkspace { form_type: FormType, id: String },

    #[error("Document {id} already lives in the {form_type} {tier} tier")]
    TierExclusivity {
        form_type: FormType,
        id: String,
        tier: Tier,
    },

    #[error("The workspace holds at most one document, got {0}")]
    WorkspaceOverflow(usize),

    #[error("Unknown form type '{0}'")]
    UnknownFormType(String),

    #[error("Unknown storage tier '{0}'")]
    UnknownTier(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Database(_) => "STORAGE_UNAVAILABLE",
            Error::TransitionConflict { .. } => "TRANSITION_CONFLICT",
            Error::Sync(SyncError::Unauthenticated) => "UNAUTHENTICATED",
            Error::Sync(SyncError::RemoteUnavailable(_)) => "REMOTE_UNAVAILABLE",
            Error::Sync(SyncError::AlreadyInProgress(_)) => "ALREADY_IN_PROGRESS",
            Error::Validation(_) => "VALIDATION_FAILED",
            Error::Serialization(_) => "SERIALIZATION_FAILED",
            Error::Unexpected(_) => "INTERNAL",
        }
    }

    /// Storage failures leave the process without a usable local store.
    pub fn requires_restart(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_failures_require_restart() {
        let storage = Error::Database(DatabaseError::QueryFailed("disk I/O error".into()));
        assert!(storage.requires_restart());
        assert_eq!(storage.code(), "STORAGE_UNAVAILABLE");

        let busy = Error::Sync(SyncError::AlreadyInProgress(FormType::ExpenseReport));
        assert!(!busy.requires_restart());
        assert_eq!(busy.code(), "ALREADY_IN_PROGRESS");
    }

    #[test]
    fn transition_conflict_names_source_tier() {
        let err = Error::TransitionConflict {
            form_type: FormType::PurchaseOrder,
            id: "po-1".into(),
            from: Tier::Workspace,
        };
        assert_eq!(
            err.to_string(),
            "Cannot move purchase-order/po-1: document is not in the workspace tier"
        );
    }
}
