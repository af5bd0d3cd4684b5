//! Error types for live sessions.

use axum::extract::ws::close_code;
use thiserror::Error;

/// Fatal conditions of a live session.
///
/// Each one ends the session with a single `error` event and an abnormal close.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Malformed handshake or unexpected first message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Missing credentials, connect failure or broken upstream stream
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A chunk could not be translated
    #[error("Translation failed: {0}")]
    Translation(String),

    /// The client connection failed while writing
    #[error("Client connection failed: {0}")]
    Transport(String),
}

impl SessionError {
    pub fn upstream(err: anyhow::Error) -> Self {
        SessionError::Upstream(format!("{:#}", err))
    }

    pub fn translation(err: anyhow::Error) -> Self {
        SessionError::Translation(format!("{:#}", err))
    }

    pub fn transport(err: anyhow::Error) -> Self {
        SessionError::Transport(format!("{:#}", err))
    }

    /// WebSocket close code sent to the client
    pub fn close_code(&self) -> u16 {
        match self {
            SessionError::Protocol(_) => close_code::POLICY,
            _ => close_code::ERROR,
        }
    }
}
