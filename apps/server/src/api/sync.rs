//! Cloud sync endpoints and the live sync-status stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Serialize;
use tracing::{debug, info};

use formdesk_core::sync::{ConflictReport, PullSummary, PushOutcome, SyncStatus};

use super::parse_form_type;
use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

const STATUS_EVENT: &str = "sync-status";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRemoteResponse {
    deleted: bool,
}

async fn push_to_cloud(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<PushOutcome>> {
    let form_type = parse_form_type(&form)?;
    info!("[Sync] Push requested for {}/{}", form_type, id);
    let outcome = state
        .sync_orchestrator
        .push_to_cloud(form_type, &id)
        .await
        .map_err(ApiError::during("push_to_cloud"))?;
    Ok(Json(outcome))
}

async fn pull_from_cloud(
    State(state): State<Arc<AppState>>,
    Path(form): Path<String>,
) -> ApiResult<Json<PullSummary>> {
    let form_type = parse_form_type(&form)?;
    info!("[Sync] Pull requested for {}", form_type);
    let summary = state
        .sync_orchestrator
        .pull_from_cloud(form_type)
        .await
        .map_err(ApiError::during("pull_from_cloud"))?;
    Ok(Json(summary))
}

async fn detect_conflict(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<ConflictReport>> {
    let form_type = parse_form_type(&form)?;
    let report = state
        .sync_orchestrator
        .detect_conflict(form_type, &id)
        .await
        .map_err(ApiError::during("detect_conflict"))?;
    Ok(Json(report))
}

async fn delete_from_cloud(
    State(state): State<Arc<AppState>>,
    Path((form, id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteRemoteResponse>> {
    let form_type = parse_form_type(&form)?;
    let deleted = state
        .sync_orchestrator
        .delete_from_cloud(form_type, &id)
        .await
        .map_err(ApiError::during("delete_from_cloud"))?;
    Ok(Json(DeleteRemoteResponse { deleted }))
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<SyncStatus> {
    Json(state.sync_status.snapshot())
}

fn status_event(status: &SyncStatus) -> Event {
    Event::default()
        .event(STATUS_EVENT)
        .json_data(status)
        .unwrap_or_else(|_| Event::default().event(STATUS_EVENT))
}

/// Emits the current status, then one event per change.
async fn stream_status(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("[Sync] Status stream subscriber connected");
    let receiver = state.sync_status.subscribe();
    let events = stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let event = status_event(&receiver.borrow_and_update());
        Some((Ok(event), (receiver, false)))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/status", get(get_status))
        .route("/sync/status/stream", get(stream_status))
        .route("/sync/:form/push/:id", post(push_to_cloud))
        .route("/sync/:form/pull", post(pull_from_cloud))
        .route("/sync/:form/conflicts/:id", get(detect_conflict))
        .route("/sync/:form/remote/:id", delete(delete_from_cloud))
}
