//! Speech-to-text collaborators
//!
//! - `client`: the `Transcriber` seam and its OpenAI-compatible Whisper client
//! - `window`: periodic re-transcription of a trailing audio window

mod client;
mod window;

pub use client::{Transcriber, WhisperClient};
pub use window::{PollGate, SharedBuffer, WindowConfig, WindowPoller};
