//! Live translation session management
//!
//! This module provides the `LiveSession` state machine that manages:
//! - Handshake with the client (target language)
//! - Audio ingestion into the selected transcript source
//! - Transcript deltas, chunking and dedup
//! - Ordered translation dispatch
//! - Draining and session statistics

mod config;
mod messages;
mod session;
mod sink;
mod source;
mod stats;

pub use config::SessionConfig;
pub use messages::{ClientMessage, ServerMessage};
pub use session::{LiveSession, SessionState};
pub use sink::ClientSink;
pub use source::{open_source, AudioInput, TranscriptFeed};
pub use stats::{SessionCounters, SessionStats};
