pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod local_asr;
pub mod session;
pub mod transcript;
pub mod transcription;
pub mod translation;
pub mod upstream;

pub use audio::{AudioIngestAdapter, AudioSource, SlidingWindowBuffer};
pub use config::{Config, SourceKind};
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use local_asr::{create_local_asr_router, LocalAsrState};
pub use session::{ClientMessage, LiveSession, ServerMessage, SessionConfig, SessionState, SessionStats};
pub use transcript::{ChunkPipeline, ChunkSegmenter, RecentChunkHistory, TranscriptEvent};
pub use transcription::{Transcriber, WhisperClient, WindowPoller};
pub use translation::{ChatTranslator, Translator};
pub use upstream::UpstreamConnection;
