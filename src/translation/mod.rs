//! Translation collaborators and per-session ordered dispatch
//!
//! - `client`: the `Translator` seam and its streaming chat-completions client
//! - `dispatch`: single-consumer FIFO queue feeding one translation worker

mod client;
mod dispatch;

pub use client::{parse_sse_line, ChatTranslator, FragmentReceiver, SseLine, Translator};
pub use dispatch::{spawn_translation_worker, DispatchQueue, WorkerHandle};
