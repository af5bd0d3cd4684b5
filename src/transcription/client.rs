use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::audio::AudioSource;
use crate::config::WhisperConfig;

/// Synchronous (request/response) transcription of a complete audio payload
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Full transcript text of `audio`
    async fn transcribe(&self, audio: AudioSource) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// Client for an OpenAI-compatible `/v1/audio/transcriptions` endpoint
pub struct WhisperClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl WhisperClient {
    pub fn new(config: &WhisperConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Whisper HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/v1/audio/transcriptions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

fn mime_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("webm") => "audio/webm",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        _ => "audio/wav",
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: AudioSource) -> Result<String> {
        let file_name = audio.file_name();
        let bytes = audio.into_bytes().await?;
        if bytes.is_empty() {
            return Ok(String::new());
        }

        debug!("Transcribing {} bytes as {}", bytes.len(), file_name);

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime_for(&file_name))
            .context("Invalid audio mime type")?;
        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Transcription request failed")?
            .error_for_status()
            .context("Transcription endpoint returned an error")?;

        let body: TranscriptionResponse = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        Ok(body.text.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for("audio.wav"), "audio/wav");
        assert_eq!(mime_for("talk.MP3"), "audio/mpeg");
        assert_eq!(mime_for("clip.opus"), "audio/ogg");
        assert_eq!(mime_for("noext"), "audio/wav");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = WhisperConfig {
            base_url: "http://whisper:8000/".to_string(),
            ..Default::default()
        };
        let client = WhisperClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "http://whisper:8000/v1/audio/transcriptions");
    }
}
