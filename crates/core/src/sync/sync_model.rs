//! Sync status record, remote file listing and conflict policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::documents::{Document, FormType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalSyncState {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudSyncState {
    #[default]
    Idle,
    Syncing,
    Synced,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub operation: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Process-wide view of local and cloud persistence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub local: LocalSyncState,
    pub cloud: CloudSyncState,
    pub last_local_save: Option<DateTime<Utc>>,
    pub last_cloud_sync: Option<DateTime<Utc>>,
    pub last_error: Option<SyncFailure>,
}

/// Entry of a remote folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub modified_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    pub form_type: FormType,
    pub document_id: String,
    pub remote_file_id: String,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSummary {
    pub form_type: FormType,
    /// Remote `.json` files seen in the folder.
    pub listed: usize,
    /// Documents now resident in the cache.
    pub cached: usize,
    /// Files that could not be parsed or belong to another form type.
    pub skipped: usize,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictWinner {
    Local,
    Cloud,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub document_id: String,
    pub has_conflict: bool,
    pub local_modified: Option<DateTime<Utc>>,
    pub cloud_modified: Option<DateTime<Utc>>,
    pub winner: Option<ConflictWinner>,
}

/// Last-writer-wins on `lastModified` (falling back to `updatedAt`).
/// The cloud copy must be strictly newer to win; ties keep the local copy.
pub fn resolve_conflict(local: &Document, cloud: &Document) -> ConflictWinner {
    if cloud.modified_at() > local.modified_at() {
        ConflictWinner::Cloud
    } else {
        ConflictWinner::Local
    }
}
