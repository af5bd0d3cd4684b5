use anyhow::{Context, Result};
use std::path::PathBuf;

/// Encoded audio handed to a transcriber
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Audio file on disk
    Path(PathBuf),
    /// Encoded audio already in memory (e.g. a WAV window)
    Memory(Vec<u8>),
}

impl AudioSource {
    /// File name reported to the transcription endpoint
    pub fn file_name(&self) -> String {
        match self {
            AudioSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audio.wav".to_string()),
            AudioSource::Memory(_) => "audio.wav".to_string(),
        }
    }

    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            AudioSource::Path(path) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read audio file: {:?}", path)),
            AudioSource::Memory(bytes) => Ok(bytes),
        }
    }
}
