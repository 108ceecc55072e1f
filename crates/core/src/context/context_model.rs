use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::documents::{Document, FormType, Tier};

/// Where the active document of the session lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePointer {
    pub form_type: FormType,
    pub tier: Tier,
    pub doc_id: Option<String>,
}

/// Context state of the active form type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ContextState {
    NoContext,
    WorkspaceActive,
    #[serde(rename_all = "camelCase")]
    CacheActive {
        doc_id: String,
    },
}

/// Per-form mirror of the persisted tiers.
#[derive(Debug, Clone, Default)]
pub struct FormContext {
    pub workspace: Option<Document>,
    pub cache: BTreeMap<String, Document>,
    pub hydrated: bool,
}
