use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use log::debug;

use super::context_model::{ActivePointer, ContextState, FormContext};
use crate::documents::{Document, FormType, Tier};

/// Builds the blank document shown for an empty workspace.
pub type DocumentFactory = Arc<dyn Fn(FormType) -> Document + Send + Sync>;

pub fn default_document_factory() -> DocumentFactory {
    Arc::new(|form_type| Document::new(form_type, Utc::now()))
}

/// In-memory mirror of each form type's workspace and cache, plus the
/// pointer to the document the session is working on.
///
/// The mirror is a convenience for fast switching. The persisted store stays
/// authoritative and is reloaded through [`hydrate`](Self::hydrate).
pub struct DocumentContextManager {
    contexts: HashMap<FormType, FormContext>,
    active: Option<ActivePointer>,
    factory: DocumentFactory,
}

impl Default for DocumentContextManager {
    fn default() -> Self {
        Self::new(default_document_factory())
    }
}

impl DocumentContextManager {
    pub fn new(factory: DocumentFactory) -> Self {
        Self {
            contexts: HashMap::new(),
            active: None,
            factory,
        }
    }

    /// Returns true when the form type was not registered before.
    pub fn register_form_type(&mut self, form_type: FormType) -> bool {
        if self.contexts.contains_key(&form_type) {
            return false;
        }
        self.contexts.insert(form_type, FormContext::default());
        true
    }

    pub fn register_all_form_types(&mut self) {
        for form_type in FormType::ALL {
            self.register_form_type(form_type);
        }
    }

    pub fn is_registered(&self, form_type: FormType) -> bool {
        self.contexts.contains_key(&form_type)
    }

    pub fn is_hydrated(&self, form_type: FormType) -> bool {
        self.contexts
            .get(&form_type)
            .is_some_and(|context| context.hydrated)
    }

    /// Replaces the mirror of a form type with persisted state.
    pub fn hydrate(
        &mut self,
        form_type: FormType,
        workspace: Option<Document>,
        cache: Vec<Document>,
    ) {
        let context = self.contexts.entry(form_type).or_default();
        context.workspace = workspace;
        context.cache = cache.into_iter().map(|doc| (doc.id.clone(), doc)).collect();
        context.hydrated = true;
        debug!(
            "[DocContext] Hydrated {} (workspace: {}, cache: {})",
            form_type,
            context.workspace.is_some(),
            context.cache.len()
        );
    }

    /// Points the session at a form type and tier, returning the document there.
    pub fn switch_context(
        &mut self,
        form_type: FormType,
        tier: Tier,
        doc_id: Option<String>,
    ) -> Option<Document> {
        self.register_form_type(form_type);
        self.active = Some(ActivePointer {
            form_type,
            tier,
            doc_id,
        });
        self.get_current_doc()
    }

    /// Writes a snapshot into the slot under the active pointer.
    ///
    /// Workspace replaces the slot; cache upserts by id, or removes the pointed
    /// document when `document` is `None`. Returns false with no active pointer.
    pub fn save_current_state(&mut self, document: Option<Document>) -> bool {
        let Some(pointer) = self.active.clone() else {
            return false;
        };
        let context = self.contexts.entry(pointer.form_type).or_default();
        match pointer.tier {
            Tier::Workspace => context.workspace = document,
            Tier::Cache => match document {
                Some(doc) => {
                    let id = pointer.doc_id.unwrap_or_else(|| doc.id.clone());
                    context.cache.insert(id, doc);
                }
                None => {
                    if let Some(id) = pointer.doc_id {
                        context.cache.remove(&id);
                    }
                }
            },
        }
        true
    }

    /// Document under the active pointer. An empty workspace gets a blank
    /// document from the factory, which is kept in the mirror.
    pub fn get_current_doc(&mut self) -> Option<Document> {
        let pointer = self.active.clone()?;
        let factory = Arc::clone(&self.factory);
        let context = self.contexts.entry(pointer.form_type).or_default();
        match pointer.tier {
            Tier::Workspace => Some(
                context
                    .workspace
                    .get_or_insert_with(|| factory(pointer.form_type))
                    .clone(),
            ),
            Tier::Cache => pointer
                .doc_id
                .and_then(|id| context.cache.get(&id).cloned()),
        }
    }

    pub fn create_blank(&self, form_type: FormType) -> Document {
        (self.factory)(form_type)
    }

    pub fn workspace_doc(&self, form_type: FormType) -> Option<&Document> {
        self.contexts
            .get(&form_type)
            .and_then(|context| context.workspace.as_ref())
    }

    pub fn set_workspace_doc(&mut self, form_type: FormType, document: Document) {
        self.contexts.entry(form_type).or_default().workspace = Some(document);
    }

    pub fn clear_workspace_doc(&mut self, form_type: FormType) {
        if let Some(context) = self.contexts.get_mut(&form_type) {
            context.workspace = None;
        }
    }

    pub fn cache_doc(&self, form_type: FormType, id: &str) -> Option<&Document> {
        self.contexts
            .get(&form_type)
            .and_then(|context| context.cache.get(id))
    }

    pub fn upsert_cache_doc(&mut self, form_type: FormType, document: Document) {
        self.contexts
            .entry(form_type)
            .or_default()
            .cache
            .insert(document.id.clone(), document);
    }

    pub fn remove_cache_doc(&mut self, form_type: FormType, id: &str) -> bool {
        self.contexts
            .get_mut(&form_type)
            .is_some_and(|context| context.cache.remove(id).is_some())
    }

    pub fn replace_cache(&mut self, form_type: FormType, documents: Vec<Document>) {
        self.contexts.entry(form_type).or_default().cache = documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();
    }

    /// Ids of the workspace documents held in the mirror, by form type.
    pub fn all_workspace_doc_ids(&self) -> BTreeMap<FormType, String> {
        self.contexts
            .iter()
            .filter_map(|(form_type, context)| {
                context
                    .workspace
                    .as_ref()
                    .map(|doc| (*form_type, doc.id.clone()))
            })
            .collect()
    }

    pub fn state(&self) -> ContextState {
        match &self.active {
            None => ContextState::NoContext,
            Some(ActivePointer {
                tier: Tier::Workspace,
                ..
            }) => ContextState::WorkspaceActive,
            Some(ActivePointer {
                tier: Tier::Cache,
                doc_id: Some(id),
                ..
            }) => ContextState::CacheActive { doc_id: id.clone() },
            Some(ActivePointer {
                tier: Tier::Cache,
                doc_id: None,
                ..
            }) => ContextState::NoContext,
        }
    }

    pub fn active_pointer(&self) -> Option<&ActivePointer> {
        self.active.as_ref()
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn reset(&mut self) {
        self.contexts.clear();
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(form_type: FormType, title: &str) -> Document {
        let mut doc = Document::new(form_type, Utc::now());
        doc.title = title.to_string();
        doc.enter_tier(Tier::Cache, Utc::now());
        doc
    }

    #[test]
    fn starts_without_context() {
        let mut manager = DocumentContextManager::default();
        assert_eq!(manager.state(), ContextState::NoContext);
        assert!(manager.get_current_doc().is_none());
        assert!(!manager.save_current_state(None));
    }

    #[test]
    fn empty_workspace_synthesizes_one_blank_document() {
        let mut manager = DocumentContextManager::default();
        let first = manager
            .switch_context(FormType::ExpenseReport, Tier::Workspace, None)
            .unwrap();
        let second = manager.get_current_doc().unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.form_type(), Some(FormType::ExpenseReport));
        assert_eq!(manager.state(), ContextState::WorkspaceActive);
        assert!(manager.is_registered(FormType::ExpenseReport));
    }

    #[test]
    fn switching_between_forms_keeps_each_mirror() {
        let mut manager = DocumentContextManager::default();
        manager.register_all_form_types();

        let mut expense = manager
            .switch_context(FormType::ExpenseReport, Tier::Workspace, None)
            .unwrap();
        expense.title = "lunch".into();
        manager.save_current_state(Some(expense.clone()));

        let travel = manager
            .switch_context(FormType::TravelReport, Tier::Workspace, None)
            .unwrap();
        assert_ne!(travel.id, expense.id);

        let back = manager
            .switch_context(FormType::ExpenseReport, Tier::Workspace, None)
            .unwrap();
        assert_eq!(back.title, "lunch");
        assert_eq!(manager.all_workspace_doc_ids().len(), 2);
    }

    #[test]
    fn cache_pointer_tracks_document_by_id() {
        let mut manager = DocumentContextManager::default();
        let doc = cached(FormType::PurchaseOrder, "po");
        manager.hydrate(FormType::PurchaseOrder, None, vec![doc.clone()]);

        let current = manager
            .switch_context(FormType::PurchaseOrder, Tier::Cache, Some(doc.id.clone()))
            .unwrap();
        assert_eq!(current.title, "po");
        assert_eq!(
            manager.state(),
            ContextState::CacheActive {
                doc_id: doc.id.clone()
            }
        );

        assert!(manager.save_current_state(None));
        assert!(manager.cache_doc(FormType::PurchaseOrder, &doc.id).is_none());
        assert!(manager.get_current_doc().is_none());
    }

    #[test]
    fn cache_without_document_id_has_no_context() {
        let mut manager = DocumentContextManager::default();
        assert!(manager
            .switch_context(FormType::BaseTemplate, Tier::Cache, None)
            .is_none());
        assert_eq!(manager.state(), ContextState::NoContext);
    }

    #[test]
    fn injected_factory_builds_blank_documents() {
        let factory: DocumentFactory = Arc::new(|form_type| {
            let mut doc = Document::new(form_type, Utc::now());
            doc.department = "Finance".into();
            doc
        });
        let mut manager = DocumentContextManager::new(factory);
        let doc = manager
            .switch_context(FormType::ExpenseReport, Tier::Workspace, None)
            .unwrap();
        assert_eq!(doc.department, "Finance");
    }

    #[test]
    fn reset_forgets_everything() {
        let mut manager = DocumentContextManager::default();
        manager.hydrate(
            FormType::ExpenseReport,
            Some(Document::new(FormType::ExpenseReport, Utc::now())),
            Vec::new(),
        );
        manager.switch_context(FormType::ExpenseReport, Tier::Workspace, None);

        manager.reset();
        assert_eq!(manager.state(), ContextState::NoContext);
        assert!(!manager.is_hydrated(FormType::ExpenseReport));
        assert!(manager.all_workspace_doc_ids().is_empty());
    }
}
