//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::documents::{DocumentRepositoryTrait, Document, FormType, Tier, UploadReceipt};
use crate::errors::{DatabaseError, Error, Result, SyncError, ValidationError};
use crate::sync::{Authenticator, RemoteFile, RemoteStorage};

type Partitions = HashMap<(FormType, Tier), Vec<Document>>;

/// Repository with the same tier rules as the SQLite store. Each write works
/// on a staged copy that only replaces the live state when the write succeeds.
#[derive(Default)]
pub struct InMemoryDocumentRepository {
    partitions: Mutex<Partitions>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryDocumentRepository {
    pub fn seed(&self, form_type: FormType, tier: Tier, document: Document) {
        let mut partitions = self.partitions.lock().expect("repository lock");
        partitions
            .entry((form_type, tier))
            .or_default()
            .push(document.with_provenance(tier));
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<(FormType, Tier, Document)> {
        let partitions = self.partitions.lock().expect("repository lock");
        let mut rows: Vec<_> = partitions
            .iter()
            .flat_map(|((form, tier), docs)| docs.iter().map(|doc| (*form, *tier, doc.clone())))
            .collect();
        rows.sort_by(|a, b| {
            (a.0, a.1.as_str(), a.2.id.as_str()).cmp(&(b.0, b.1.as_str(), b.2.id.as_str()))
        });
        rows
    }

    fn write<T>(&self, job: impl FnOnce(&mut Partitions) -> Result<T>) -> Result<T> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "simulated write failure".into(),
            )));
        }
        let mut live = self.partitions.lock().expect("repository lock");
        let mut staged = live.clone();
        let output = job(&mut staged)?;
        *live = staged;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(output)
    }
}

fn upsert(docs: &mut Vec<Document>, document: Document) {
    match docs.iter_mut().find(|doc| doc.id == document.id) {
        Some(existing) => *existing = document,
        None => docs.push(document),
    }
}

#[async_trait]
impl DocumentRepositoryTrait for InMemoryDocumentRepository {
    fn get(&self, form_type: FormType, tier: Tier, id: &str) -> Result<Option<Document>> {
        let partitions = self.partitions.lock().expect("repository lock");
        Ok(partitions
            .get(&(form_type, tier))
            .and_then(|docs| docs.iter().find(|doc| doc.id == id).cloned()))
    }

    fn get_all(&self, form_type: FormType, tier: Tier) -> Result<Vec<Document>> {
        let partitions = self.partitions.lock().expect("repository lock");
        let mut docs = partitions
            .get(&(form_type, tier))
            .cloned()
            .unwrap_or_default();
        if tier == Tier::Cache {
            docs.sort_by(|a, b| b.cloud_synced_at.cmp(&a.cloud_synced_at));
        }
        Ok(docs)
    }

    async fn put(&self, form_type: FormType, tier: Tier, document: Document) -> Result<Document> {
        let document = document.with_provenance(tier);
        self.write(|partitions| {
            match tier {
                Tier::Workspace => {
                    if let Some(cache) = partitions.get_mut(&(form_type, Tier::Cache)) {
                        cache.retain(|doc| doc.id != document.id);
                    }
                    partitions.insert((form_type, Tier::Workspace), vec![document.clone()]);
                }
                Tier::Cache => {
                    let resident = partitions
                        .get(&(form_type, Tier::Workspace))
                        .is_some_and(|docs| docs.iter().any(|doc| doc.id == document.id));
                    if resident {
                        return Err(ValidationError::TierExclusivity {
                            form_type,
                            id: document.id.clone(),
                            tier: Tier::Workspace,
                        }
                        .into());
                    }
                    upsert(
                        partitions.entry((form_type, Tier::Cache)).or_default(),
                        document.clone(),
                    );
                }
            }
            Ok(document)
        })
    }

    async fn delete(&self, form_type: FormType, tier: Tier, id: String) -> Result<bool> {
        self.write(|partitions| {
            let Some(docs) = partitions.get_mut(&(form_type, tier)) else {
                return Ok(false);
            };
            let before = docs.len();
            docs.retain(|doc| doc.id != id);
            Ok(docs.len() != before)
        })
    }

    async fn clear_and_repopulate(
        &self,
        form_type: FormType,
        tier: Tier,
        documents: Vec<Document>,
    ) -> Result<usize> {
        self.write(|partitions| match tier {
            Tier::Workspace => {
                if documents.len() > 1 {
                    return Err(ValidationError::WorkspaceOverflow(documents.len()).into());
                }
                let ids: HashSet<String> = documents.iter().map(|doc| doc.id.clone()).collect();
                if let Some(cache) = partitions.get_mut(&(form_type, Tier::Cache)) {
                    cache.retain(|doc| !ids.contains(&doc.id));
                }
                let docs: Vec<Document> = documents
                    .into_iter()
                    .map(|doc| doc.with_provenance(Tier::Workspace))
                    .collect();
                let count = docs.len();
                partitions.insert((form_type, Tier::Workspace), docs);
                Ok(count)
            }
            Tier::Cache => {
                let resident: HashSet<String> = partitions
                    .get(&(form_type, Tier::Workspace))
                    .map(|docs| docs.iter().map(|doc| doc.id.clone()).collect())
                    .unwrap_or_default();
                let mut docs = Vec::new();
                for doc in documents {
                    if !resident.contains(&doc.id) {
                        upsert(&mut docs, doc.with_provenance(Tier::Cache));
                    }
                }
                let count = docs.len();
                partitions.insert((form_type, Tier::Cache), docs);
                Ok(count)
            }
        })
    }

    async fn move_atomic(
        &self,
        form_type: FormType,
        from: Tier,
        to: Tier,
        id: String,
        receipt: Option<UploadReceipt>,
    ) -> Result<Document> {
        self.write(|partitions| {
            if from == to {
                return Err(ValidationError::InvalidInput(format!(
                    "cannot move {} within the {} tier",
                    id, from
                ))
                .into());
            }
            let source = partitions.entry((form_type, from)).or_default();
            let Some(position) = source.iter().position(|doc| doc.id == id) else {
                return Err(Error::TransitionConflict {
                    form_type,
                    id: id.clone(),
                    from,
                });
            };
            let mut document = source.remove(position);
            document.enter_tier(to, Utc::now());
            if let Some(receipt) = &receipt {
                receipt.apply(&mut document);
            }

            let target = partitions.entry((form_type, to)).or_default();
            if to == Tier::Workspace {
                target.clear();
            }
            upsert(target, document.clone());
            Ok(document)
        })
    }

    async fn clear_partition(&self, form_type: FormType, tier: Tier) -> Result<usize> {
        self.write(|partitions| {
            Ok(partitions
                .remove(&(form_type, tier))
                .map(|docs| docs.len())
                .unwrap_or(0))
        })
    }
}

#[derive(Debug, Clone)]
struct StoredFile {
    id: String,
    name: String,
    content: String,
    modified_time: String,
}

/// Remote store keyed by folder, with an optional gate that parks `list_files`.
#[derive(Default)]
pub struct MockRemoteStorage {
    folders: Mutex<BTreeMap<String, Vec<StoredFile>>>,
    unavailable: AtomicBool,
    next_id: AtomicUsize,
    gated: AtomicBool,
    pub listing_entered: Notify,
    pub listing_release: Notify,
}

impl MockRemoteStorage {
    pub fn put_file(&self, folder: &str, name: &str, content: &str) -> String {
        let id = format!("file-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut folders = self.folders.lock().expect("remote lock");
        folders.entry(folder.to_string()).or_default().push(StoredFile {
            id: id.clone(),
            name: name.to_string(),
            content: content.to_string(),
            modified_time: Utc::now().to_rfc3339(),
        });
        id
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn gate_listing(&self, gated: bool) {
        self.gated.store(gated, Ordering::SeqCst);
    }

    pub fn file_names(&self, folder: &str) -> Vec<String> {
        let folders = self.folders.lock().expect("remote lock");
        folders
            .get(folder)
            .map(|files| files.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn content_of(&self, folder: &str, name: &str) -> Option<String> {
        let folders = self.folders.lock().expect("remote lock");
        folders
            .get(folder)
            .and_then(|files| files.iter().find(|f| f.name == name))
            .map(|f| f.content.clone())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable("connection refused".into()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStorage for MockRemoteStorage {
    async fn list_files(&self, folder: &str) -> Result<Vec<RemoteFile>> {
        if self.gated.load(Ordering::SeqCst) {
            self.listing_entered.notify_one();
            self.listing_release.notified().await;
        }
        self.check_available()?;
        let folders = self.folders.lock().expect("remote lock");
        Ok(folders
            .get(folder)
            .map(|files| {
                files
                    .iter()
                    .map(|f| RemoteFile {
                        id: f.id.clone(),
                        name: f.name.clone(),
                        modified_time: Some(f.modified_time.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upload_or_replace(
        &self,
        folder: &str,
        name: &str,
        content: String,
    ) -> Result<RemoteFile> {
        self.check_available()?;
        let existing = {
            let mut folders = self.folders.lock().expect("remote lock");
            let files = folders.entry(folder.to_string()).or_default();
            files.iter_mut().find(|f| f.name == name).map(|file| {
                file.content = content.clone();
                file.modified_time = Utc::now().to_rfc3339();
                file.id.clone()
            })
        };
        let id = match existing {
            Some(id) => id,
            None => self.put_file(folder, name, &content),
        };
        Ok(RemoteFile {
            id,
            name: name.to_string(),
            modified_time: Some(Utc::now().to_rfc3339()),
        })
    }

    async fn download_content(&self, file_id: &str) -> Result<String> {
        self.check_available()?;
        let folders = self.folders.lock().expect("remote lock");
        folders
            .values()
            .flatten()
            .find(|f| f.id == file_id)
            .map(|f| f.content.clone())
            .ok_or_else(|| SyncError::RemoteUnavailable(format!("file {} not found", file_id)).into())
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.check_available()?;
        let mut folders = self.folders.lock().expect("remote lock");
        for files in folders.values_mut() {
            files.retain(|f| f.id != file_id);
        }
        Ok(())
    }
}

pub struct StaticAuthenticator(AtomicBool);

impl StaticAuthenticator {
    pub fn new(authenticated: bool) -> Self {
        Self(AtomicBool::new(authenticated))
    }

    pub fn set(&self, authenticated: bool) {
        self.0.store(authenticated, Ordering::SeqCst);
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn is_authenticated(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
