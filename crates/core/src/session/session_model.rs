use serde::{Deserialize, Serialize};

use crate::documents::{ActiveForm, AttachmentRef, Document};

/// Why a document (or the placeholder) became current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitContext {
    #[default]
    Startup,
    FormSwitch,
    NewDocument,
    LoadWorkspace,
    LoadCache,
    MoveToWorkspace,
    CloudSaveComplete,
    CloudPullComplete,
    LoadError,
    Direct,
}

impl InitContext {
    /// Short hint shown next to the document.
    pub fn guide(&self, editable: bool, placeholder: bool) -> &'static str {
        if placeholder {
            return match self {
                InitContext::CloudSaveComplete => {
                    "Saved to the cloud. Open it from the cloud list or start a new document."
                }
                InitContext::LoadError => "The document could not be loaded.",
                InitContext::FormSwitch | InitContext::Startup => {
                    "Create a new document or open one from the list."
                }
                _ => "No document is open.",
            };
        }
        if !editable {
            return "Read-only cloud copy. Move it to the workspace to edit.";
        }
        match self {
            InitContext::NewDocument => "New document. Changes stay local until you save.",
            InitContext::MoveToWorkspace => "Cloud copy moved to the workspace for editing.",
            _ => "Editing the workspace document.",
        }
    }
}

/// What the presentation layer renders for the current document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub active_form: ActiveForm,
    pub document: Document,
    pub is_editable: bool,
    pub is_placeholder: bool,
    pub is_dirty: bool,
    pub fingerprint: Option<String>,
    pub attachments: Vec<AttachmentRef>,
    pub context: InitContext,
    pub guide: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NewDocumentOutcome {
    /// A workspace document exists and discarding it was not confirmed.
    #[serde(rename_all = "camelCase")]
    ConfirmationRequired { existing_id: String },
    Created { view: Box<DocumentView> },
}
