use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use super::session_model::{DocumentView, InitContext, NewDocumentOutcome};
use crate::context::{
    default_document_factory, ActivePointer, ContextState, DocumentContextManager,
    DocumentFactory,
};
use crate::documents::{ActiveForm, Document, FormStorageServiceTrait, FormType, Tier};
use crate::errors::{Result, ValidationError};
use crate::sync::SyncStatusBoard;

struct SessionState {
    active_form: ActiveForm,
    context: DocumentContextManager,
    current: Document,
    editable: bool,
    fingerprint: Option<String>,
    init_context: InitContext,
}

impl SessionState {
    fn is_dirty(&self) -> bool {
        if self.current.is_placeholder() {
            return false;
        }
        match &self.fingerprint {
            Some(recorded) => self
                .current
                .fingerprint()
                .map(|now| &now != recorded)
                .unwrap_or(true),
            None => true,
        }
    }

    fn view(&self) -> DocumentView {
        let is_placeholder = self.current.is_placeholder();
        DocumentView {
            active_form: self.active_form,
            document: self.current.clone(),
            is_editable: self.editable,
            is_placeholder,
            is_dirty: self.is_dirty(),
            fingerprint: self.fingerprint.clone(),
            attachments: self.current.attachments.clone(),
            context: self.init_context,
            guide: self
                .init_context
                .guide(self.editable, is_placeholder)
                .to_string(),
        }
    }

    fn require_form(&self) -> Result<FormType> {
        self.active_form
            .form_type()
            .ok_or_else(|| ValidationError::NoFormSelected.into())
    }

    fn require_editable(&self) -> Result<()> {
        if self.current.is_placeholder() {
            return Err(ValidationError::NoActiveDocument.into());
        }
        if !self.editable {
            return Err(ValidationError::ReadOnlyDocument(self.current.id.clone()).into());
        }
        Ok(())
    }
}

/// Owner of the current document and the only path that changes it.
pub struct DocumentSession {
    storage: Arc<dyn FormStorageServiceTrait>,
    status: Arc<SyncStatusBoard>,
    state: Mutex<SessionState>,
}

impl DocumentSession {
    pub fn new(storage: Arc<dyn FormStorageServiceTrait>, status: Arc<SyncStatusBoard>) -> Self {
        Self::with_factory(storage, status, default_document_factory())
    }

    pub fn with_factory(
        storage: Arc<dyn FormStorageServiceTrait>,
        status: Arc<SyncStatusBoard>,
        factory: DocumentFactory,
    ) -> Self {
        let mut context = DocumentContextManager::new(factory);
        context.register_all_form_types();
        Self {
            storage,
            status,
            state: Mutex::new(SessionState {
                active_form: ActiveForm::Unselected,
                context,
                current: Document::placeholder(None, Utc::now()),
                editable: false,
                fingerprint: None,
                init_context: InitContext::Startup,
            }),
        }
    }

    /// Makes `document` current, or the blank placeholder when `None`.
    ///
    /// The previous document's latest snapshot is first written back into the
    /// context under the old pointer, so switching never loses in-memory edits.
    pub async fn set_current_document(
        &self,
        document: Option<Document>,
        context: InitContext,
    ) -> Result<DocumentView> {
        let mut state = self.state.lock().await;
        self.apply(&mut state, document, context)
    }

    fn apply(
        &self,
        state: &mut SessionState,
        document: Option<Document>,
        init_context: InitContext,
    ) -> Result<DocumentView> {
        let document = document.filter(|doc| !doc.is_placeholder());
        let fingerprint = document.as_ref().map(Document::fingerprint).transpose()?;
        if let Some(form_type) = document.as_ref().and_then(Document::form_type) {
            if !state.context.is_hydrated(form_type) {
                self.hydrate(state, form_type)?;
            }
        }

        if !state.current.is_placeholder() {
            let previous = state.current.clone();
            state.context.save_current_state(Some(previous));
        }

        match document {
            Some(doc) => {
                let tier = doc.provenance.unwrap_or(if doc.is_read_only {
                    Tier::Cache
                } else {
                    Tier::Workspace
                });
                if let Some(form_type) = doc.form_type() {
                    state.active_form = ActiveForm::Selected(form_type);
                    state
                        .context
                        .switch_context(form_type, tier, Some(doc.id.clone()));
                    state.context.save_current_state(Some(doc.clone()));
                }
                debug!(
                    "[Session] Current document {} ({}, {:?})",
                    doc.id, tier, init_context
                );
                state.editable = !doc.is_read_only;
                state.fingerprint = fingerprint;
                state.current = doc;
            }
            None => {
                debug!("[Session] Current document cleared ({:?})", init_context);
                state.current = Document::placeholder(state.active_form.form_type(), Utc::now());
                state.editable = false;
                state.fingerprint = None;
            }
        }
        state.init_context = init_context;
        Ok(state.view())
    }

    fn hydrate(&self, state: &mut SessionState, form_type: FormType) -> Result<()> {
        let workspace = self
            .storage
            .get_workspace_documents(form_type)?
            .into_iter()
            .next();
        let cache = self.storage.get_cache_documents(form_type)?;
        state.context.hydrate(form_type, workspace, cache);
        Ok(())
    }

    /// Reloads the mirror of a form type after store writes made outside the session.
    pub async fn rehydrate(&self, form_type: FormType) -> Result<()> {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state, form_type)
    }

    pub async fn current_view(&self) -> DocumentView {
        self.state.lock().await.view()
    }

    pub async fn active_form(&self) -> ActiveForm {
        self.state.lock().await.active_form
    }

    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.is_dirty()
    }

    /// Changes the active form type and shows the placeholder.
    pub async fn switch_form(&self, form: ActiveForm) -> Result<DocumentView> {
        let mut state = self.state.lock().await;
        if let Some(form_type) = form.form_type() {
            if !state.context.is_hydrated(form_type) {
                self.hydrate(&mut state, form_type)?;
            }
        }
        info!("[Session] Switching form to {}", form);
        state.active_form = form;
        let view = self.apply(&mut state, None, InitContext::FormSwitch)?;
        state.context.clear_active();
        Ok(view)
    }

    /// Points the context at a tier of the active form and returns the document there.
    pub async fn switch_context(
        &self,
        form_type: FormType,
        tier: Tier,
        doc_id: Option<String>,
    ) -> Result<Option<Document>> {
        let mut state = self.state.lock().await;
        if !state.context.is_hydrated(form_type) {
            self.hydrate(&mut state, form_type)?;
        }
        Ok(state.context.switch_context(form_type, tier, doc_id))
    }

    pub async fn save_current_state(&self, document: Option<Document>) -> bool {
        self.state.lock().await.context.save_current_state(document)
    }

    pub async fn get_current_doc(&self) -> Option<Document> {
        self.state.lock().await.context.get_current_doc()
    }

    pub async fn context_state(&self) -> (ContextState, Option<ActivePointer>) {
        let state = self.state.lock().await;
        (
            state.context.state(),
            state.context.active_pointer().cloned(),
        )
    }

    pub async fn workspace_doc_ids(&self) -> BTreeMap<FormType, String> {
        self.state.lock().await.context.all_workspace_doc_ids()
    }

    pub async fn reset(&self) -> DocumentView {
        let mut state = self.state.lock().await;
        state.context.reset();
        state.context.register_all_form_types();
        state.active_form = ActiveForm::Unselected;
        state.current = Document::placeholder(None, Utc::now());
        state.editable = false;
        state.fingerprint = None;
        state.init_context = InitContext::Startup;
        state.view()
    }

    /// Loads a stored document of the active form and makes it current.
    pub async fn load_document(&self, id: &str, tier: Tier) -> Result<DocumentView> {
        let mut state = self.state.lock().await;
        let form_type = state.require_form()?;
        let loaded = match tier {
            Tier::Workspace => self.storage.get_from_workspace(form_type, id),
            Tier::Cache => self.storage.get_from_cache(form_type, id),
        };
        match loaded {
            Ok(Some(doc)) => {
                let context = match tier {
                    Tier::Workspace => InitContext::LoadWorkspace,
                    Tier::Cache => InitContext::LoadCache,
                };
                self.apply(&mut state, Some(doc), context)
            }
            Ok(None) => {
                warn!("[Session] {} not found in {} {}", id, form_type, tier);
                self.apply(&mut state, None, InitContext::LoadError)
            }
            Err(err) => {
                error!("[Session] Failed to load {}: {}", id, err);
                self.apply(&mut state, None, InitContext::LoadError)?;
                Err(err)
            }
        }
    }

    /// Moves a cached document into the workspace and opens it for editing.
    pub async fn open_for_editing(&self, id: &str) -> Result<DocumentView> {
        let mut state = self.state.lock().await;
        let form_type = state.require_form()?;
        let moved = self.storage.move_to_workspace(form_type, id).await?;
        state.context.remove_cache_doc(form_type, id);
        self.apply(&mut state, Some(moved), InitContext::MoveToWorkspace)
    }

    /// Replaces the workspace document of the active form with a fresh blank one.
    pub async fn new_document(&self, discard_existing: bool) -> Result<NewDocumentOutcome> {
        let mut state = self.state.lock().await;
        let form_type = state.require_form()?;

        let existing = self
            .storage
            .get_workspace_documents(form_type)?
            .into_iter()
            .next();
        if let Some(existing) = existing {
            if !discard_existing {
                return Ok(NewDocumentOutcome::ConfirmationRequired {
                    existing_id: existing.id,
                });
            }
            self.storage
                .delete_from_workspace(form_type, &existing.id)
                .await?;
        }
        state.context.clear_workspace_doc(form_type);

        let blank = state.context.create_blank(form_type);
        self.status.local_saving();
        let saved = match self.storage.save_to_workspace(form_type, blank).await {
            Ok(saved) => saved,
            Err(err) => {
                self.status.local_failed("new_document", err.to_string());
                return Err(err);
            }
        };
        self.status.local_saved(Utc::now());
        info!("[Session] Created {} document {}", form_type, saved.id);

        let view = self.apply(&mut state, Some(saved), InitContext::NewDocument)?;
        Ok(NewDocumentOutcome::Created {
            view: Box::new(view),
        })
    }

    /// Applies an edit to the current document. The id and form type are fixed.
    pub async fn edit<F>(&self, edit: F) -> Result<DocumentView>
    where
        F: FnOnce(&mut Document) -> Result<()> + Send,
    {
        let mut state = self.state.lock().await;
        state.require_editable()?;

        let mut draft = state.current.clone();
        edit(&mut draft)?;
        if draft.id != state.current.id || draft.form_type() != state.current.form_type() {
            return Err(ValidationError::InvalidInput(
                "document id and form type cannot be edited".into(),
            )
            .into());
        }
        state.current = draft;
        Ok(state.view())
    }

    /// Persists the current workspace document.
    pub async fn save_document(&self) -> Result<DocumentView> {
        let mut state = self.state.lock().await;
        state.require_editable()?;
        self.persist_current(&mut state, "save_document").await?;
        Ok(state.view())
    }

    /// Saves unsaved edits of `id` to the workspace when it is the current
    /// editable document. Returns whether a write happened.
    pub async fn save_pending_edits(&self, form_type: FormType, id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.current.id != id
            || state.current.form_type() != Some(form_type)
            || !state.editable
            || !state.is_dirty()
        {
            return Ok(false);
        }
        debug!("[Session] Saving pending edits of {} before upload", id);
        self.persist_current(&mut state, "save_pending_edits").await?;
        Ok(true)
    }

    async fn persist_current(&self, state: &mut SessionState, operation: &str) -> Result<()> {
        let form_type = state
            .current
            .form_type()
            .ok_or(ValidationError::NoFormSelected)?;

        let now = Utc::now();
        let mut document = state.current.clone();
        document.updated_at = now;
        document.last_saved = Some(now);

        self.status.local_saving();
        let saved = match self.storage.save_to_workspace(form_type, document).await {
            Ok(saved) => saved,
            Err(err) => {
                error!("[Session] {} failed: {}", operation, err);
                self.status.local_failed(operation, err.to_string());
                return Err(err);
            }
        };
        self.status.local_saved(now);

        state.fingerprint = Some(saved.fingerprint()?);
        state.context.set_workspace_doc(form_type, saved.clone());
        state.current = saved;
        Ok(())
    }

    /// Keeps the context consistent after a push moved a document to the cache.
    /// If the pushed document was current, the placeholder takes its place.
    pub async fn on_moved_to_cache(
        &self,
        form_type: FormType,
        document: Document,
    ) -> Result<DocumentView> {
        let mut state = self.state.lock().await;
        state.context.clear_workspace_doc(form_type);
        state.context.upsert_cache_doc(form_type, document.clone());

        if state.current.id != document.id {
            return Ok(state.view());
        }
        state
            .context
            .switch_context(form_type, Tier::Cache, Some(document.id.clone()));
        state.current = document;
        state.editable = false;
        self.apply(&mut state, None, InitContext::CloudSaveComplete)
    }

    pub async fn on_cache_refreshed(&self, form_type: FormType, documents: Vec<Document>) {
        let mut state = self.state.lock().await;
        state.context.replace_cache(form_type, documents);
    }

    /// Drops a cached document from the context. A current read-only copy is
    /// replaced with the placeholder.
    pub async fn on_cache_entry_removed(&self, form_type: FormType, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.context.remove_cache_doc(form_type, id);
        if state.current.id == id && !state.editable {
            // skip the write-back of the removed copy
            state.current = Document::placeholder(state.active_form.form_type(), Utc::now());
            self.apply(&mut state, None, InitContext::Direct)?;
        }
        Ok(())
    }
}
