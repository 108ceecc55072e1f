//! Current-document session endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use formdesk_core::context::{ActivePointer, ContextState};
use formdesk_core::documents::{ActiveForm, Document, FormType, Tier};
use formdesk_core::session::{DocumentView, InitContext, NewDocumentOutcome};

use super::DocumentDto;
use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchFormRequest {
    pub form: ActiveForm,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCurrentRequest {
    pub document: Option<Document>,
    #[serde(default)]
    pub context: Option<InitContext>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchContextRequest {
    pub form_type: FormType,
    pub tier: Tier,
    #[serde(default)]
    pub doc_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStateRequest {
    pub document: Option<Document>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocumentRequest {
    #[serde(default)]
    pub discard_existing: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadDocumentRequest {
    pub id: String,
    pub tier: Tier,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDocumentRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedStateResponse {
    saved: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextResponse {
    #[serde(flatten)]
    state: ContextState,
    pointer: Option<ActivePointer>,
    workspace_doc_ids: BTreeMap<FormType, String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn switch_form(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SwitchFormRequest>,
) -> ApiResult<Json<DocumentView>> {
    info!("[Session] Form switch requested: {}", body.form);
    let view = state
        .session
        .switch_form(body.form)
        .await
        .map_err(ApiError::during("switch_form"))?;
    Ok(Json(view))
}

async fn get_current(State(state): State<Arc<AppState>>) -> Json<DocumentView> {
    Json(state.session.current_view().await)
}

async fn set_current(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetCurrentRequest>,
) -> ApiResult<Json<DocumentView>> {
    let view = state
        .session
        .set_current_document(body.document, body.context.unwrap_or(InitContext::Direct))
        .await
        .map_err(ApiError::during("set_current_document"))?;
    Ok(Json(view))
}

/// Replaces the editable content of the current document.
async fn edit_current(
    State(state): State<Arc<AppState>>,
    Json(incoming): Json<Document>,
) -> ApiResult<Json<DocumentView>> {
    let view = state
        .session
        .edit(move |doc| {
            let provenance = doc.provenance;
            *doc = incoming;
            doc.provenance = provenance;
            Ok(())
        })
        .await
        .map_err(ApiError::during("edit"))?;
    Ok(Json(view))
}

async fn switch_context(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SwitchContextRequest>,
) -> ApiResult<Json<Option<DocumentDto>>> {
    let document = state
        .session
        .switch_context(body.form_type, body.tier, body.doc_id)
        .await
        .map_err(ApiError::during("switch_context"))?;
    Ok(Json(document.map(DocumentDto::from)))
}

async fn save_current_state(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveStateRequest>,
) -> Json<SavedStateResponse> {
    let saved = state.session.save_current_state(body.document).await;
    Json(SavedStateResponse { saved })
}

async fn get_context(State(state): State<Arc<AppState>>) -> Json<ContextResponse> {
    let (context_state, pointer) = state.session.context_state().await;
    Json(ContextResponse {
        state: context_state,
        pointer,
        workspace_doc_ids: state.session.workspace_doc_ids().await,
    })
}

async fn get_context_doc(State(state): State<Arc<AppState>>) -> Json<Option<DocumentDto>> {
    Json(state.session.get_current_doc().await.map(DocumentDto::from))
}

async fn new_document(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewDocumentRequest>,
) -> ApiResult<Json<NewDocumentOutcome>> {
    let outcome = state
        .session
        .new_document(body.discard_existing)
        .await
        .map_err(ApiError::during("new_document"))?;
    Ok(Json(outcome))
}

async fn load_document(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoadDocumentRequest>,
) -> ApiResult<Json<DocumentView>> {
    let view = state
        .session
        .load_document(&body.id, body.tier)
        .await
        .map_err(ApiError::during("load_document"))?;
    Ok(Json(view))
}

async fn open_for_editing(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OpenDocumentRequest>,
) -> ApiResult<Json<DocumentView>> {
    let view = state
        .session
        .open_for_editing(&body.id)
        .await
        .map_err(ApiError::during("move_to_workspace"))?;
    Ok(Json(view))
}

async fn save_document(State(state): State<Arc<AppState>>) -> ApiResult<Json<DocumentView>> {
    let view = state
        .session
        .save_document()
        .await
        .map_err(ApiError::during("save_document"))?;
    Ok(Json(view))
}

async fn reset(State(state): State<Arc<AppState>>) -> Json<DocumentView> {
    Json(state.session.reset().await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session/form", post(switch_form))
        .route(
            "/session/current",
            get(get_current).put(set_current).patch(edit_current),
        )
        .route("/session/context", get(get_context).post(switch_context))
        .route("/session/context/doc", get(get_context_doc))
        .route("/session/state", post(save_current_state))
        .route("/session/documents/new", post(new_document))
        .route("/session/documents/load", post(load_document))
        .route("/session/documents/open", post(open_for_editing))
        .route("/session/documents/save", post(save_document))
        .route("/session/reset", post(reset))
}
