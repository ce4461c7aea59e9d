use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(serde_json::json!({"ok": true, "store": "connected"})).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "health check could not reach the store");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"ok": false, "error": "store unavailable"})),
            )
                .into_response()
        }
    }
}
