use std::sync::Arc;

use axum::Router;
use serde::Serialize;

use formdesk_core::documents::{ActiveForm, Document, FormType};
use formdesk_core::errors::ValidationError;

use crate::error::ApiResult;
use crate::main_lib::AppState;

mod auth;
mod forms;
mod session;
mod sync;

pub fn app_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(forms::router())
        .merge(session::router())
        .merge(sync::router())
        .merge(auth::router());

    Router::new().nest("/api/v1", api).with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared request/response helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Document as sent to clients, with the tier it was read from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDto {
    #[serde(flatten)]
    pub document: Document,
    pub is_from_workspace: bool,
    pub is_from_cache: bool,
}

impl From<Document> for DocumentDto {
    fn from(document: Document) -> Self {
        Self {
            is_from_workspace: document.is_from_workspace(),
            is_from_cache: document.is_from_cache(),
            document,
        }
    }
}

pub fn to_dtos(documents: Vec<Document>) -> Vec<DocumentDto> {
    documents.into_iter().map(DocumentDto::from).collect()
}

/// Form path segment; `none` is accepted and means no form is selected.
pub fn parse_form(value: &str) -> ApiResult<ActiveForm> {
    Ok(value.parse::<ActiveForm>().map_err(formdesk_core::Error::from)?)
}

/// Form path segment that must name a form type.
pub fn parse_form_type(value: &str) -> ApiResult<FormType> {
    parse_form(value)?
        .form_type()
        .ok_or_else(|| formdesk_core::Error::from(ValidationError::NoFormSelected).into())
}
