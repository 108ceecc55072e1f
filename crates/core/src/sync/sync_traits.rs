use async_trait::async_trait;

use super::sync_model::RemoteFile;
use crate::errors::Result;

/// Remote object store holding one folder per form type.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    async fn list_files(&self, folder: &str) -> Result<Vec<RemoteFile>>;

    /// Creates the file or replaces the content of the file with the same name.
    async fn upload_or_replace(&self, folder: &str, name: &str, content: String)
        -> Result<RemoteFile>;

    async fn download_content(&self, file_id: &str) -> Result<String>;

    async fn delete_file(&self, file_id: &str) -> Result<()>;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn is_authenticated(&self) -> bool;
}
