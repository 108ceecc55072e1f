//! Form-scoped document storage endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::debug;

use formdesk_core::documents::{ActiveForm, Document, FormScope, FormType, StorageStats};

use super::{parse_form, to_dtos, DocumentDto};
use crate::error::ApiResult;
use crate::main_lib::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormTypeInfo {
    form_type: FormType,
    display_name: &'static str,
    folder: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeletedResponse {
    deleted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    count: usize,
}

fn scope(state: &AppState, form: &str) -> ApiResult<FormScope> {
    Ok(FormScope::new(
        state.storage_service.clone(),
        parse_form(form)?,
    ))
}

/// Keeps the session mirror in step with writes made through these endpoints.
async fn rehydrate(state: &AppState, form: ActiveForm) -> ApiResult<()> {
    if let Some(form_type) = form.form_type() {
        state.session.rehydrate(form_type).await?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn list_form_types() -> Json<Vec<FormTypeInfo>> {
    Json(
        FormType::ALL
            .into_iter()
            .map(|form_type| FormTypeInfo {
                form_type,
                display_name: form_type.display_name(),
                folder: form_type.folder_key(),
            })
            .collect(),
    )
}

async fn get_workspace_documents(
    State(state): State<Arc<AppState>>,
    Path(form): Path<String>,
) -> ApiResult<Json<Vec<DocumentDto>>> {
    Ok(Json(to_dtos(scope(&state, &form)?.get_workspace_documents()?)))
}

async fn save_to_workspace(
    State(state): State<Arc<AppState>>,
    Path(form): Path<String>,
    Json(document): Json<Document>,
) -> ApiResult<Json<Option<DocumentDto>>> {
    let scope = scope(&state, &form)?;
    let saved = scope.save_to_workspace(document).await?;
    rehydrate(&state, scope.form()).await?;
    Ok(Json(saved.map(DocumentDto::from)))
}

async fn get_from_workspace(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<Option<DocumentDto>>> {
    let document = scope(&state, &form)?.get_from_workspace(&id)?;
    Ok(Json(document.map(DocumentDto::from)))
}

async fn delete_from_workspace(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<DeletedResponse>> {
    let scope = scope(&state, &form)?;
    let deleted = scope.delete_from_workspace(&id).await?;
    if deleted {
        rehydrate(&state, scope.form()).await?;
    }
    Ok(Json(DeletedResponse { deleted }))
}

async fn get_cache_documents(
    State(state): State<Arc<AppState>>,
    Path(form): Path<String>,
) -> ApiResult<Json<Vec<DocumentDto>>> {
    Ok(Json(to_dtos(scope(&state, &form)?.get_cache_documents()?)))
}

async fn get_from_cache(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<Option<DocumentDto>>> {
    let document = scope(&state, &form)?.get_from_cache(&id)?;
    Ok(Json(document.map(DocumentDto::from)))
}

async fn delete_from_cache(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<DeletedResponse>> {
    let scope = scope(&state, &form)?;
    let deleted = scope.delete_from_cache(&id).await?;
    if let (true, Some(form_type)) = (deleted, scope.form().form_type()) {
        state.session.on_cache_entry_removed(form_type, &id).await?;
    }
    Ok(Json(DeletedResponse { deleted }))
}

async fn refresh_cache(
    State(state): State<Arc<AppState>>,
    Path(form): Path<String>,
    Json(documents): Json<Vec<Document>>,
) -> ApiResult<Json<RefreshResponse>> {
    let scope = scope(&state, &form)?;
    let count = scope.refresh_cache(documents).await?;
    if let Some(form_type) = scope.form().form_type() {
        let cache = scope.get_cache_documents()?;
        state.session.on_cache_refreshed(form_type, cache).await;
    }
    debug!("[Forms] Cache of {} refreshed with {} documents", form, count);
    Ok(Json(RefreshResponse { count }))
}

async fn move_to_cache(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<Option<DocumentDto>>> {
    let scope = scope(&state, &form)?;
    let moved = scope.move_to_cache(&id).await?;
    if let (Some(doc), Some(form_type)) = (&moved, scope.form().form_type()) {
        state.session.on_moved_to_cache(form_type, doc.clone()).await?;
    }
    Ok(Json(moved.map(DocumentDto::from)))
}

async fn move_to_workspace(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<Option<DocumentDto>>> {
    let scope = scope(&state, &form)?;
    let moved = scope.move_to_workspace(&id).await?;
    rehydrate(&state, scope.form()).await?;
    Ok(Json(moved.map(DocumentDto::from)))
}

async fn get_all_documents(
    State(state): State<Arc<AppState>>,
    Path(form): Path<String>,
) -> ApiResult<Json<Vec<DocumentDto>>> {
    Ok(Json(to_dtos(scope(&state, &form)?.get_all_documents()?)))
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<Option<DocumentDto>>> {
    let document = scope(&state, &form)?.get_document(&id)?;
    Ok(Json(document.map(DocumentDto::from)))
}

async fn get_storage_stats(
    State(state): State<Arc<AppState>>,
    Path(form): Path<String>,
) -> ApiResult<Json<Option<StorageStats>>> {
    Ok(Json(scope(&state, &form)?.storage_stats()?))
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/forms", get(list_form_types))
        // Workspace tier
        .route(
            "/forms/:form/workspace",
            get(get_workspace_documents).put(save_to_workspace),
        )
        .route(
            "/forms/:form/workspace/:id",
            get(get_from_workspace).delete(delete_from_workspace),
        )
        // Cache tier
        .route("/forms/:form/cache", get(get_cache_documents))
        .route("/forms/:form/cache/refresh", post(refresh_cache))
        .route(
            "/forms/:form/cache/:id",
            get(get_from_cache).delete(delete_from_cache),
        )
        // Tier transitions and merged views
        .route(
            "/forms/:form/documents/:id/move-to-cache",
            post(move_to_cache),
        )
        .route(
            "/forms/:form/documents/:id/move-to-workspace",
            post(move_to_workspace),
        )
        .route("/forms/:form/documents", get(get_all_documents))
        .route("/forms/:form/documents/:id", get(get_document))
        .route("/forms/:form/stats", get(get_storage_stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::main_lib::test_support::test_state;
    use chrono::Utc;

    #[tokio::test]
    async fn none_form_short_circuits() {
        let state = test_state();
        let Json(saved) = save_to_workspace(
            State(state.clone()),
            Path("none".to_string()),
            Json(Document::new(FormType::ExpenseReport, Utc::now())),
        )
        .await
        .unwrap();
        assert!(saved.is_none());

        let Json(stats) = get_storage_stats(State(state.clone()), Path("none".to_string()))
            .await
            .unwrap();
        assert!(stats.is_none());
        assert!(state
            .storage_service
            .get_workspace_documents(FormType::ExpenseReport)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn save_move_and_list_through_handlers() {
        let state = test_state();
        let form = "purchase-order".to_string();
        let doc = Document::new(FormType::PurchaseOrder, Utc::now());

        save_to_workspace(State(state.clone()), Path(form.clone()), Json(doc.clone()))
            .await
            .unwrap();
        let Json(moved) = move_to_cache(State(state.clone()), Path((form.clone(), doc.id.clone())))
            .await
            .unwrap();
        let moved = moved.expect("moved document");
        assert!(moved.is_from_cache);
        assert!(moved.document.is_read_only);

        let Json(all) = get_all_documents(State(state.clone()), Path(form.clone()))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_from_cache);

        let Json(workspace) = get_workspace_documents(State(state), Path(form))
            .await
            .unwrap();
        assert!(workspace.is_empty());
    }

    #[tokio::test]
    async fn unknown_form_is_rejected() {
        let state = test_state();
        let err = get_cache_documents(State(state), Path("memo".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ApiError::Core { .. }));
    }
}
