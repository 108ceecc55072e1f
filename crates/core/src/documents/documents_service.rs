use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};

use super::documents_model::{
    Document, DocumentSummary, FormType, StorageStats, Tier, UploadReceipt,
};
use super::documents_traits::{DocumentRepositoryTrait, FormStorageServiceTrait};
use crate::errors::{Result, ValidationError};

/// Form-scoped storage over the dual-tier document repository.
pub struct FormStorageService {
    repository: Arc<dyn DocumentRepositoryTrait>,
}

impl FormStorageService {
    pub fn new(repository: Arc<dyn DocumentRepositoryTrait>) -> Self {
        Self { repository }
    }

    fn ensure_belongs_to(form_type: FormType, document: &Document) -> Result<()> {
        if document.id.trim().is_empty() {
            return Err(ValidationError::InvalidInput("document id is required".into()).into());
        }
        if document.form_type() != Some(form_type) {
            return Err(ValidationError::InvalidInput(format!(
                "document {} is not a {} document",
                document.id, form_type
            ))
            .into());
        }
        Ok(())
    }

    fn summarize(documents: &[Document], tier: Tier) -> Vec<DocumentSummary> {
        documents
            .iter()
            .map(|doc| DocumentSummary {
                id: doc.id.clone(),
                title: doc.title.clone(),
                timestamp: match tier {
                    Tier::Workspace => doc.last_modified,
                    Tier::Cache => doc.cloud_synced_at,
                },
            })
            .collect()
    }
}

#[async_trait]
impl FormStorageServiceTrait for FormStorageService {
    async fn save_to_workspace(
        &self,
        form_type: FormType,
        mut document: Document,
    ) -> Result<Document> {
        Self::ensure_belongs_to(form_type, &document)?;
        document.mark_workspace_save(Utc::now());
        debug!(
            "[FormStorage] Saving {} to {} workspace",
            document.id, form_type
        );
        self.repository
            .put(form_type, Tier::Workspace, document)
            .await
    }

    fn get_from_workspace(&self, form_type: FormType, id: &str) -> Result<Option<Document>> {
        Ok(self
            .repository
            .get(form_type, Tier::Workspace, id)?
            .map(|doc| doc.with_provenance(Tier::Workspace)))
    }

    fn get_from_cache(&self, form_type: FormType, id: &str) -> Result<Option<Document>> {
        Ok(self
            .repository
            .get(form_type, Tier::Cache, id)?
            .map(|doc| doc.with_provenance(Tier::Cache)))
    }

    async fn delete_from_workspace(&self, form_type: FormType, id: &str) -> Result<bool> {
        self.repository
            .delete(form_type, Tier::Workspace, id.to_string())
            .await
    }

    async fn delete_from_cache(&self, form_type: FormType, id: &str) -> Result<bool> {
        self.repository
            .delete(form_type, Tier::Cache, id.to_string())
            .await
    }

    async fn move_to_cache(&self, form_type: FormType, id: &str) -> Result<Document> {
        let moved = self
            .repository
            .move_atomic(form_type, Tier::Workspace, Tier::Cache, id.to_string(), None)
            .await?;
        info!("[FormStorage] Moved {} to {} cache", id, form_type);
        Ok(moved)
    }

    async fn move_to_workspace(&self, form_type: FormType, id: &str) -> Result<Document> {
        let moved = self
            .repository
            .move_atomic(form_type, Tier::Cache, Tier::Workspace, id.to_string(), None)
            .await?;
        info!("[FormStorage] Moved {} to {} workspace", id, form_type);
        Ok(moved)
    }

    async fn commit_upload(
        &self,
        form_type: FormType,
        id: &str,
        receipt: UploadReceipt,
    ) -> Result<Document> {
        let remote_file_id = receipt.remote_file_id.clone();
        let moved = self
            .repository
            .move_atomic(
                form_type,
                Tier::Workspace,
                Tier::Cache,
                id.to_string(),
                Some(receipt),
            )
            .await?;
        info!(
            "[FormStorage] Committed upload of {} to {} cache (remote {})",
            id, form_type, remote_file_id
        );
        Ok(moved)
    }

    async fn refresh_cache(&self, form_type: FormType, documents: Vec<Document>) -> Result<usize> {
        let now = Utc::now();
        let mut stamped = Vec::with_capacity(documents.len());
        for mut doc in documents {
            Self::ensure_belongs_to(form_type, &doc)?;
            doc.enter_tier(Tier::Cache, now);
            stamped.push(doc);
        }

        let count = self
            .repository
            .clear_and_repopulate(form_type, Tier::Cache, stamped)
            .await?;
        info!(
            "[FormStorage] Refreshed {} cache with {} documents",
            form_type, count
        );
        Ok(count)
    }

    fn get_all_documents(&self, form_type: FormType) -> Result<Vec<Document>> {
        let mut documents = self.get_workspace_documents(form_type)?;
        let workspace_ids: HashSet<String> = documents.iter().map(|doc| doc.id.clone()).collect();
        documents.extend(
            self.get_cache_documents(form_type)?
                .into_iter()
                .filter(|doc| !workspace_ids.contains(&doc.id)),
        );
        Ok(documents)
    }

    fn get_document(&self, form_type: FormType, id: &str) -> Result<Option<Document>> {
        if let Some(doc) = self.get_from_workspace(form_type, id)? {
            return Ok(Some(doc));
        }
        self.get_from_cache(form_type, id)
    }

    fn get_workspace_documents(&self, form_type: FormType) -> Result<Vec<Document>> {
        Ok(self
            .repository
            .get_all(form_type, Tier::Workspace)?
            .into_iter()
            .map(|doc| doc.with_provenance(Tier::Workspace))
            .collect())
    }

    fn get_cache_documents(&self, form_type: FormType) -> Result<Vec<Document>> {
        Ok(self
            .repository
            .get_all(form_type, Tier::Cache)?
            .into_iter()
            .map(|doc| doc.with_provenance(Tier::Cache))
            .collect())
    }

    async fn save_to_cache(&self, form_type: FormType, mut document: Document) -> Result<Document> {
        Self::ensure_belongs_to(form_type, &document)?;
        document.enter_tier(Tier::Cache, Utc::now());
        self.repository.put(form_type, Tier::Cache, document).await
    }

    fn prepare_for_upload(&self, form_type: FormType, id: &str) -> Result<Option<Document>> {
        let now = Utc::now();
        Ok(self.get_from_workspace(form_type, id)?.map(|mut doc| {
            doc.uploaded_at = Some(now);
            doc.is_draft = false;
            doc
        }))
    }

    fn storage_stats(&self, form_type: FormType) -> Result<StorageStats> {
        let workspace = self.get_workspace_documents(form_type)?;
        let cache = self.get_cache_documents(form_type)?;
        Ok(StorageStats {
            form_type,
            workspace_count: workspace.len(),
            cache_count: cache.len(),
            workspace: Self::summarize(&workspace, Tier::Workspace),
            cache: Self::summarize(&cache, Tier::Cache),
        })
    }

    async fn clear_all(&self) -> Result<()> {
        for form_type in FormType::ALL {
            for tier in [Tier::Workspace, Tier::Cache] {
                self.repository.clear_partition(form_type, tier).await?;
            }
        }
        info!("[FormStorage] Cleared all document partitions");
        Ok(())
    }
}
