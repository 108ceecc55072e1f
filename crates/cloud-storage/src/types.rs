//! Wire types for the cloud storage API.

use formdesk_core::sync::RemoteFile;
use serde::{Deserialize, Serialize};

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl From<FileEntry> for RemoteFile {
    fn from(entry: FileEntry) -> Self {
        RemoteFile {
            id: entry.id,
            name: entry.name,
            modified_time: entry.modified_time,
        }
    }
}

/// GET /api/v1/folders/{folder}/files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileEntry>,
}
