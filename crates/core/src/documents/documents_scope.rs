use std::sync::Arc;

use log::debug;

use super::documents_model::{ActiveForm, Document, FormType, StorageStats};
use super::documents_traits::FormStorageServiceTrait;
use crate::errors::Result;

/// Storage calls bound to the active form.
///
/// With no form selected every call succeeds without touching the store:
/// reads come back empty, writes and moves return `None`.
#[derive(Clone)]
pub struct FormScope {
    service: Arc<dyn FormStorageServiceTrait>,
    form: ActiveForm,
}

impl FormScope {
    pub fn new(service: Arc<dyn FormStorageServiceTrait>, form: ActiveForm) -> Self {
        Self { service, form }
    }

    pub fn form(&self) -> ActiveForm {
        self.form
    }

    fn selected(&self, operation: &str) -> Option<FormType> {
        let form = self.form.form_type();
        if form.is_none() {
            debug!("[FormScope] Skipping {} with no form selected", operation);
        }
        form
    }

    pub async fn save_to_workspace(&self, document: Document) -> Result<Option<Document>> {
        match self.selected("save_to_workspace") {
            Some(form) => self.service.save_to_workspace(form, document).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn get_from_workspace(&self, id: &str) -> Result<Option<Document>> {
        match self.selected("get_from_workspace") {
            Some(form) => self.service.get_from_workspace(form, id),
            None => Ok(None),
        }
    }

    pub fn get_from_cache(&self, id: &str) -> Result<Option<Document>> {
        match self.selected("get_from_cache") {
            Some(form) => self.service.get_from_cache(form, id),
            None => Ok(None),
        }
    }

    pub async fn delete_from_workspace(&self, id: &str) -> Result<bool> {
        match self.selected("delete_from_workspace") {
            Some(form) => self.service.delete_from_workspace(form, id).await,
            None => Ok(false),
        }
    }

    pub async fn delete_from_cache(&self, id: &str) -> Result<bool> {
        match self.selected("delete_from_cache") {
            Some(form) => self.service.delete_from_cache(form, id).await,
            None => Ok(false),
        }
    }

    pub async fn move_to_cache(&self, id: &str) -> Result<Option<Document>> {
        match self.selected("move_to_cache") {
            Some(form) => self.service.move_to_cache(form, id).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn move_to_workspace(&self, id: &str) -> Result<Option<Document>> {
        match self.selected("move_to_workspace") {
            Some(form) => self.service.move_to_workspace(form, id).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn refresh_cache(&self, documents: Vec<Document>) -> Result<usize> {
        match self.selected("refresh_cache") {
            Some(form) => self.service.refresh_cache(form, documents).await,
            None => Ok(0),
        }
    }

    pub fn get_all_documents(&self) -> Result<Vec<Document>> {
        match self.selected("get_all_documents") {
            Some(form) => self.service.get_all_documents(form),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_document(&self, id: &str) -> Result<Option<Document>> {
        match self.selected("get_document") {
            Some(form) => self.service.get_document(form, id),
            None => Ok(None),
        }
    }

    pub fn get_workspace_documents(&self) -> Result<Vec<Document>> {
        match self.selected("get_workspace_documents") {
            Some(form) => self.service.get_workspace_documents(form),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_cache_documents(&self) -> Result<Vec<Document>> {
        match self.selected("get_cache_documents") {
            Some(form) => self.service.get_cache_documents(form),
            None => Ok(Vec::new()),
        }
    }

    pub fn storage_stats(&self) -> Result<Option<StorageStats>> {
        match self.selected("storage_stats") {
            Some(form) => self.service.storage_stats(form).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{FormStorageService, Tier};
    use crate::test_support::InMemoryDocumentRepository;
    use chrono::Utc;

    #[tokio::test]
    async fn unselected_scope_never_touches_the_store() {
        let repository = Arc::new(InMemoryDocumentRepository::default());
        let service: Arc<dyn FormStorageServiceTrait> =
            Arc::new(FormStorageService::new(repository.clone()));
        repository.seed(
            FormType::ExpenseReport,
            Tier::Workspace,
            Document::new(FormType::ExpenseReport, Utc::now()),
        );
        let before = repository.snapshot();
        let writes_before = repository.write_count();

        let scope = FormScope::new(service, ActiveForm::Unselected);
        let doc = Document::new(FormType::ExpenseReport, Utc::now());

        assert!(scope.save_to_workspace(doc.clone()).await.unwrap().is_none());
        assert!(scope.get_from_workspace(&doc.id).unwrap().is_none());
        assert!(scope.get_all_documents().unwrap().is_empty());
        assert!(!scope.delete_from_workspace(&doc.id).await.unwrap());
        assert!(scope.move_to_cache(&doc.id).await.unwrap().is_none());
        assert_eq!(scope.refresh_cache(vec![doc]).await.unwrap(), 0);
        assert!(scope.storage_stats().unwrap().is_none());

        assert_eq!(repository.snapshot(), before);
        assert_eq!(repository.write_count(), writes_before);
    }

    #[tokio::test]
    async fn selected_scope_delegates() {
        let repository = Arc::new(InMemoryDocumentRepository::default());
        let service: Arc<dyn FormStorageServiceTrait> =
            Arc::new(FormStorageService::new(repository));
        let scope = FormScope::new(service, ActiveForm::Selected(FormType::TravelReport));

        let doc = Document::new(FormType::TravelReport, Utc::now());
        let saved = scope.save_to_workspace(doc.clone()).await.unwrap();
        assert_eq!(saved.map(|d| d.id), Some(doc.id.clone()));
        assert_eq!(scope.get_all_documents().unwrap().len(), 1);
    }
}
