use async_trait::async_trait;

use super::documents_model::{Document, FormType, StorageStats, Tier, UploadReceipt};
use crate::errors::Result;

/// Durable storage partitioned by (form type, tier).
///
/// Every write runs in a single transaction: readers observe either the state
/// before the call or the state after it. Workspace partitions hold at most one
/// document, and an id never lives in both tiers of a form type at once.
#[async_trait]
pub trait DocumentRepositoryTrait: Send + Sync {
    fn get(&self, form_type: FormType, tier: Tier, id: &str) -> Result<Option<Document>>;

    /// Workspace yields zero or one entry; cache is ordered by `cloudSyncedAt`, newest first.
    fn get_all(&self, form_type: FormType, tier: Tier) -> Result<Vec<Document>>;

    /// Stores a document. A workspace write replaces the whole partition and
    /// evicts the same id from the cache; a cache write is rejected while the
    /// id is resident in the workspace.
    async fn put(&self, form_type: FormType, tier: Tier, document: Document) -> Result<Document>;

    /// Returns whether a row was removed.
    async fn delete(&self, form_type: FormType, tier: Tier, id: String) -> Result<bool>;

    /// Wholesale replacement of a partition. Cache loads skip ids resident in the workspace.
    async fn clear_and_repopulate(
        &self,
        form_type: FormType,
        tier: Tier,
        documents: Vec<Document>,
    ) -> Result<usize>;

    /// Reads from `from`, stamps tier metadata (and the upload receipt, if
    /// any), writes to `to` and removes the source row. Fails with
    /// `TransitionConflict` when the source row is absent.
    async fn move_atomic(
        &self,
        form_type: FormType,
        from: Tier,
        to: Tier,
        id: String,
        receipt: Option<UploadReceipt>,
    ) -> Result<Document>;

    async fn clear_partition(&self, form_type: FormType, tier: Tier) -> Result<usize>;
}

/// Form-type-aware facade used by the session and the sync orchestrator.
#[async_trait]
pub trait FormStorageServiceTrait: Send + Sync {
    async fn save_to_workspace(&self, form_type: FormType, document: Document)
        -> Result<Document>;
    fn get_from_workspace(&self, form_type: FormType, id: &str) -> Result<Option<Document>>;
    fn get_from_cache(&self, form_type: FormType, id: &str) -> Result<Option<Document>>;
    async fn delete_from_workspace(&self, form_type: FormType, id: &str) -> Result<bool>;
    async fn delete_from_cache(&self, form_type: FormType, id: &str) -> Result<bool>;
    async fn move_to_cache(&self, form_type: FormType, id: &str) -> Result<Document>;
    async fn move_to_workspace(&self, form_type: FormType, id: &str) -> Result<Document>;
    /// Moves an uploaded workspace document to the cache with its receipt, in one write.
    async fn commit_upload(
        &self,
        form_type: FormType,
        id: &str,
        receipt: UploadReceipt,
    ) -> Result<Document>;
    async fn refresh_cache(&self, form_type: FormType, documents: Vec<Document>) -> Result<usize>;
    fn get_all_documents(&self, form_type: FormType) -> Result<Vec<Document>>;
    fn get_document(&self, form_type: FormType, id: &str) -> Result<Option<Document>>;
    fn get_workspace_documents(&self, form_type: FormType) -> Result<Vec<Document>>;
    fn get_cache_documents(&self, form_type: FormType) -> Result<Vec<Document>>;
    async fn save_to_cache(&self, form_type: FormType, document: Document) -> Result<Document>;
    fn prepare_for_upload(&self, form_type: FormType, id: &str) -> Result<Option<Document>>;
    fn storage_stats(&self, form_type: FormType) -> Result<StorageStats>;
    async fn clear_all(&self) -> Result<()>;
}
