//! Local windowed ASR server
//!
//! Speaks the realtime transcription protocol over WebSocket on top of a
//! request/response transcription backend, by re-transcribing a trailing
//! audio window on a fixed interval and emitting only unseen text.

mod connection;
mod server;

pub use connection::serve_connection;
pub use server::{create_local_asr_router, LocalAsrState};
