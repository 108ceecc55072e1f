//! Manual push/pull between the local tiers and the remote store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::watch;

use super::sync_model::{
    resolve_conflict, ConflictReport, ConflictWinner, PullSummary, PushOutcome, RemoteFile,
    SyncStatus,
};
use super::sync_status::SyncStatusBoard;
use super::sync_traits::{Authenticator, RemoteStorage};
use crate::constants::REMOTE_FILE_EXTENSION;
use crate::documents::{Document, FormStorageServiceTrait, FormType, UploadReceipt};
use crate::errors::{Error, Result, SyncError, ValidationError};
use crate::session::DocumentSession;

/// Releases the per-form sync slot on every exit path.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<FormType>>>,
    form_type: FormType,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.form_type);
        }
    }
}

fn remote_file_name(id: &str) -> String {
    format!("{}{}", id, REMOTE_FILE_EXTENSION)
}

pub struct SyncOrchestrator {
    storage: Arc<dyn FormStorageServiceTrait>,
    remote: Arc<dyn RemoteStorage>,
    auth: Arc<dyn Authenticator>,
    session: Arc<DocumentSession>,
    status: Arc<SyncStatusBoard>,
    in_flight: Arc<Mutex<HashSet<FormType>>>,
}

impl SyncOrchestrator {
    pub fn new(
        storage: Arc<dyn FormStorageServiceTrait>,
        remote: Arc<dyn RemoteStorage>,
        auth: Arc<dyn Authenticator>,
        session: Arc<DocumentSession>,
        status: Arc<SyncStatusBoard>,
    ) -> Self {
        Self {
            storage,
            remote,
            auth,
            session,
            status,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    fn begin(&self, form_type: FormType) -> Result<InFlightGuard> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| Error::Unexpected("sync in-flight set is poisoned".to_string()))?;
        if !in_flight.insert(form_type) {
            return Err(SyncError::AlreadyInProgress(form_type).into());
        }
        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            form_type,
        })
    }

    async fn ensure_authenticated(&self) -> Result<()> {
        if self.auth.is_authenticated().await {
            Ok(())
        } else {
            Err(SyncError::Unauthenticated.into())
        }
    }

    fn fail<T>(&self, operation: &str, err: Error) -> Result<T> {
        error!("[Sync] {} failed: {}", operation, err);
        self.status.cloud_failed(operation, err.to_string());
        Err(err)
    }

    /// Uploads the workspace document and moves it into the read-only cache.
    pub async fn push_to_cloud(&self, form_type: FormType, id: &str) -> Result<PushOutcome> {
        let _guard = self.begin(form_type)?;
        self.status.cloud_syncing();
        match self.push_inner(form_type, id).await {
            Ok(outcome) => {
                self.status.cloud_synced(outcome.synced_at);
                info!("[Sync] Pushed {}/{}", form_type, id);
                Ok(outcome)
            }
            Err(err) => self.fail("push_to_cloud", err),
        }
    }

    async fn push_inner(&self, form_type: FormType, id: &str) -> Result<PushOutcome> {
        self.ensure_authenticated().await?;
        self.session.save_pending_edits(form_type, id).await?;
        let prepared = self
            .storage
            .prepare_for_upload(form_type, id)?
            .ok_or_else(|| ValidationError::NotInWorkspace {
                form_type,
                id: id.to_string(),
            })?;

        let content = serde_json::to_string_pretty(&prepared)?;
        let uploaded = self
            .remote
            .upload_or_replace(form_type.folder_key(), &remote_file_name(id), content)
            .await?;
        debug!("[Sync] Uploaded {} as remote file {}", id, uploaded.id);

        let receipt = UploadReceipt {
            remote_file_id: uploaded.id.clone(),
            remote_modified_time: uploaded.modified_time.clone(),
            uploaded_at: prepared.uploaded_at.unwrap_or_else(Utc::now),
        };
        let cached = self.storage.commit_upload(form_type, id, receipt).await?;
        let synced_at = cached.cloud_synced_at.unwrap_or_else(Utc::now);

        self.session.on_moved_to_cache(form_type, cached).await?;

        Ok(PushOutcome {
            form_type,
            document_id: id.to_string(),
            remote_file_id: uploaded.id,
            synced_at,
        })
    }

    /// Replaces the cache of a form type with the documents in its remote folder.
    pub async fn pull_from_cloud(&self, form_type: FormType) -> Result<PullSummary> {
        let _guard = self.begin(form_type)?;
        self.status.cloud_syncing();
        match self.pull_inner(form_type).await {
            Ok(summary) => {
                self.status.cloud_synced(summary.synced_at);
                info!(
                    "[Sync] Pulled {} {} documents ({} skipped)",
                    summary.cached, form_type, summary.skipped
                );
                Ok(summary)
            }
            Err(err) => self.fail("pull_from_cloud", err),
        }
    }

    async fn pull_inner(&self, form_type: FormType) -> Result<PullSummary> {
        self.ensure_authenticated().await?;
        let files: Vec<RemoteFile> = self
            .remote
            .list_files(form_type.folder_key())
            .await?
            .into_iter()
            .filter(|file| file.name.ends_with(REMOTE_FILE_EXTENSION))
            .collect();

        let mut documents = Vec::with_capacity(files.len());
        let mut skipped = 0;
        for file in &files {
            let content = self.remote.download_content(&file.id).await?;
            match serde_json::from_str::<Document>(&content) {
                Ok(doc) if doc.form_type() == Some(form_type) && !doc.id.is_empty() => {
                    let mut doc = doc;
                    doc.cloud_file_id = Some(file.id.clone());
                    doc.cloud_modified_time = file.modified_time.clone();
                    doc.is_from_cloud = true;
                    documents.push(doc);
                }
                Ok(doc) => {
                    warn!(
                        "[Sync] Skipping {}: holds a {:?} document, expected {}",
                        file.name,
                        doc.form_type(),
                        form_type
                    );
                    skipped += 1;
                }
                Err(err) => {
                    warn!("[Sync] Skipping unparseable file {}: {}", file.name, err);
                    skipped += 1;
                }
            }
        }

        let cached = self.storage.refresh_cache(form_type, documents).await?;
        let cache = self.storage.get_cache_documents(form_type)?;
        self.session.on_cache_refreshed(form_type, cache).await;

        Ok(PullSummary {
            form_type,
            listed: files.len(),
            cached,
            skipped,
            synced_at: Utc::now(),
        })
    }

    /// Winner of two copies of the same document.
    pub fn resolve_conflict(&self, local: &Document, cloud: &Document) -> Document {
        match resolve_conflict(local, cloud) {
            ConflictWinner::Local => local.clone(),
            ConflictWinner::Cloud => cloud.clone(),
        }
    }

    /// Compares the local copy of a document with the one in the remote folder.
    pub async fn detect_conflict(&self, form_type: FormType, id: &str) -> Result<ConflictReport> {
        match self.detect_inner(form_type, id).await {
            Ok(report) => Ok(report),
            Err(err) => self.fail("detect_conflict", err),
        }
    }

    async fn detect_inner(&self, form_type: FormType, id: &str) -> Result<ConflictReport> {
        self.ensure_authenticated().await?;
        let local = self.storage.get_document(form_type, id)?;
        let cloud = match self.find_remote(form_type, id).await? {
            Some(file) => {
                let content = self.remote.download_content(&file.id).await?;
                Some(serde_json::from_str::<Document>(&content)?)
            }
            None => None,
        };

        let (has_conflict, winner) = match (&local, &cloud) {
            (Some(local), Some(cloud)) => (
                local.modified_at() != cloud.modified_at(),
                Some(resolve_conflict(local, cloud)),
            ),
            _ => (false, None),
        };
        Ok(ConflictReport {
            document_id: id.to_string(),
            has_conflict,
            local_modified: local.as_ref().map(Document::modified_at),
            cloud_modified: cloud.as_ref().map(Document::modified_at),
            winner,
        })
    }

    /// Deletes the remote copy and the cached copy of a document.
    pub async fn delete_from_cloud(&self, form_type: FormType, id: &str) -> Result<bool> {
        let _guard = self.begin(form_type)?;
        match self.delete_inner(form_type, id).await {
            Ok(deleted) => Ok(deleted),
            Err(err) => self.fail("delete_from_cloud", err),
        }
    }

    async fn delete_inner(&self, form_type: FormType, id: &str) -> Result<bool> {
        self.ensure_authenticated().await?;
        let deleted = match self.find_remote(form_type, id).await? {
            Some(file) => {
                self.remote.delete_file(&file.id).await?;
                true
            }
            None => false,
        };
        if self.storage.delete_from_cache(form_type, id).await? {
            self.session.on_cache_entry_removed(form_type, id).await?;
        }
        info!("[Sync] Deleted {}/{} from cloud: {}", form_type, id, deleted);
        Ok(deleted)
    }

    async fn find_remote(&self, form_type: FormType, id: &str) -> Result<Option<RemoteFile>> {
        let name = remote_file_name(id);
        Ok(self
            .remote
            .list_files(form_type.folder_key())
            .await?
            .into_iter()
            .find(|file| file.name == name))
    }

    /// Workspace save with local status tracking.
    pub async fn save_to_local(&self, form_type: FormType, document: Document) -> Result<Document> {
        self.status.local_saving();
        match self.storage.save_to_workspace(form_type, document).await {
            Ok(saved) => {
                self.status.local_saved(Utc::now());
                Ok(saved)
            }
            Err(err) => {
                self.status.local_failed("save_to_local", err.to_string());
                Err(err)
            }
        }
    }
}
