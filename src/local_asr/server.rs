use super::connection::serve_connection;
use crate::config::Config;
use crate::session::ClientSink;
use crate::transcription::{Transcriber, WhisperClient, WindowConfig};
use anyhow::Result;
use axum::{
    extract::{
        ws::{close_code, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::StreamExt;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Shared state of the local ASR server
#[derive(Clone)]
pub struct LocalAsrState {
    pub transcriber: Arc<dyn Transcriber>,
    pub window: WindowConfig,

    /// Upgrades outside this prefix are closed with a policy violation
    pub path_prefix: String,
}

impl LocalAsrState {
    pub fn new(transcriber: Arc<dyn Transcriber>, window: WindowConfig, path_prefix: String) -> Self {
        Self {
            transcriber,
            window,
            path_prefix,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperClient::new(&config.whisper)?);
        Ok(Self::new(
            transcriber,
            config.window.clone(),
            config.local_asr.path_prefix.clone(),
        ))
    }
}

/// Create the local ASR router.
///
/// Every path other than `/health` is treated as a WebSocket upgrade.
pub fn create_local_asr_router(state: LocalAsrState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .fallback(realtime_upgrade)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn realtime_upgrade(
    State(state): State<LocalAsrState>,
    uri: Uri,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let path = uri.path().to_string();

    if !path.starts_with(&state.path_prefix) {
        warn!("Rejecting path {}", path);
        return ws.on_upgrade(reject);
    }

    ws.on_upgrade(move |socket: WebSocket| async move {
        let (sink, stream) = socket.split();
        serve_connection(state, path, ClientSink::new(sink), stream).await;
    })
}

async fn reject(socket: WebSocket) {
    let (sink, _stream) = socket.split();
    if let Err(e) = ClientSink::new(sink)
        .close(close_code::POLICY, "unsupported path")
        .await
    {
        debug!("Reject close failed: {:#}", e);
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
