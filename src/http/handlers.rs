use super::state::AppState;
use crate::session::LiveSession;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;

/// GET /ws/live
/// Upgrade and run one live translation session
pub async fn live_session(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let session = LiveSession::new(
            Arc::clone(&state.config),
            Arc::clone(&state.transcriber),
            Arc::clone(&state.translator),
        );
        let id = session.id();
        let stats = session.run(socket).await;
        info!(
            "Session {} finished after {:.1}s ({} chunks translated)",
            id, stats.duration_secs, stats.chunks_translated
        );
    })
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
