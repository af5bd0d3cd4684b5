use crate::config::Config;
use crate::session::SessionConfig;
use crate::transcription::{Transcriber, WhisperClient};
use crate::translation::{ChatTranslator, Translator};
use anyhow::Result;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Settings every new session starts from
    pub config: Arc<SessionConfig>,

    /// Used by sessions in windowed mode
    pub transcriber: Arc<dyn Transcriber>,

    pub translator: Arc<dyn Translator>,
}

impl AppState {
    pub fn new(
        config: SessionConfig,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transcriber,
            translator,
        }
    }

    /// Build the HTTP-backed collaborators described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperClient::new(&config.whisper)?);
        let translator: Arc<dyn Translator> = Arc::new(ChatTranslator::new(&config.translation)?);

        Ok(Self::new(
            SessionConfig::from_config(config),
            transcriber,
            translator,
        ))
    }
}
