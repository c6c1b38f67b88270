//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to the browse service, store and
//! artwork resolver. This is the read side a browse client (head unit,
//! external UI) talks to; writes come in over the WebSocket bridge.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::error::{TonearmError, TonearmResult};

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/api/root", get(get_root))
        .route("/api/now-playing", get(get_now_playing))
        .route("/api/children/{parent_id}", get(get_children))
        .route("/api/items/{item_id}", get(get_item))
        .route("/api/items/{item_id}/select", post(select_item))
        .route("/api/hierarchy", get(get_hierarchy))
        .route("/artwork/{key}", get(serve_artwork))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe: "Is the process running?"
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "tonearm",
        "parents": state.store.parent_count(),
        "connections": state.ws_manager.connection_count(),
    }))
}

/// Readiness probe: "Can a browse client use this service?"
///
/// Returns 200 once a hierarchy with a root has been declared, 503 with
/// details before that.
async fn readiness_check(State(state): State<AppState>) -> Response {
    let root_ready = state.store.root_id().is_some();
    let body = json!({
        "status": if root_ready { "ready" } else { "not_ready" },
        "ready": root_ready,
        "checks": {
            "root": { "ready": root_ready, "info": "hierarchy declared with a root id" }
        }
    });
    if root_ready {
        Json(body).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

/// Returns the now-playing session metadata; null until a playable item
/// has been selected.
async fn get_now_playing(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.browse.now_playing())
}

/// Returns the browsing root. 404 until a hierarchy has been declared.
async fn get_root(State(state): State<AppState>) -> TonearmResult<impl IntoResponse> {
    let root = state.browse.root().ok_or(TonearmError::NoRoot)?;
    Ok(Json(root))
}

/// Returns the children of a parent; an unknown parent yields an empty
/// list, never an error.
async fn get_children(
    State(state): State<AppState>,
    Path(parent_id): Path<String>,
) -> impl IntoResponse {
    Json(state.browse.load_children(&parent_id))
}

/// Looks an item up by id.
async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> TonearmResult<impl IntoResponse> {
    let item = state
        .store
        .get(&item_id)
        .ok_or(TonearmError::ItemNotFound(item_id))?;
    Ok(Json(item))
}

/// Reports a browse-client selection and forwards it to the declaring
/// client as a selection event.
async fn select_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> impl IntoResponse {
    let outcome = state.browse.select(&item_id);
    Json(json!({ "outcome": outcome }))
}

/// Returns the full hierarchy snapshot.
async fn get_hierarchy(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.snapshot())
}

/// Serves a locally cached copy of a registered remote icon.
///
/// The first request triggers a bounded download; any fetch failure maps
/// to 404 rather than an error, matching "no icon" semantics.
async fn serve_artwork(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.artwork.resolve(&key).await {
        Some(artwork) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, artwork.content_type)],
            artwork.bytes,
        )
            .into_response(),
        None => {
            log::debug!("[Artwork] No artwork for key {key:?}");
            TonearmError::ArtworkUnavailable(key).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Config;

    #[test]
    fn router_builds_with_wired_state() {
        let _router = create_router(AppState::wire(Config::default()));
    }
}
