//! Cloud sign-in state. The token lives only in memory.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use formdesk_core::sync::Authenticator;

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSessionRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub is_authenticated: bool,
    pub is_configured: bool,
}

async fn session_status(state: &AppState) -> SessionStatus {
    SessionStatus {
        is_authenticated: state.token_store.is_authenticated().await,
        is_configured: state.cloud_configured,
    }
}

async fn store_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StoreSessionRequest>,
) -> ApiResult<Json<SessionStatus>> {
    if body.access_token.trim().is_empty() {
        return Err(ApiError::BadRequest("accessToken must not be empty".into()));
    }
    state.token_store.set(body.access_token).await;
    info!("[Auth] Cloud session stored");
    Ok(Json(session_status(&state).await))
}

async fn clear_session(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    state.token_store.clear().await;
    info!("[Auth] Cloud session cleared");
    Json(session_status(&state).await)
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(session_status(&state).await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/auth/session",
        post(store_session).delete(clear_session).get(get_session),
    )
}
