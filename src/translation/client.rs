use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::TranslationConfig;

/// Fragments of one translation, in order. The channel closing marks the end.
pub type FragmentReceiver = mpsc::Receiver<Result<String>>;

/// Bound on fragments buffered between the HTTP reader and the consumer
const FRAGMENT_BUFFER: usize = 32;

/// Streaming translation of a piece of text
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_stream(&self, text: &str, target_language: &str) -> Result<FragmentReceiver>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl ChatMessage {
    fn text(role: &'static str, text: String) -> Self {
        Self {
            role,
            content: vec![ContentPart { kind: "text", text }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// One line of a chat-completions event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    Fragment(String),
    Done,
    Skip,
}

pub fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|s| !s.is_empty())
            .map(SseLine::Fragment)
            .unwrap_or(SseLine::Skip),
        Err(e) => {
            debug!("Skipping unparseable stream line: {}", e);
            SseLine::Skip
        }
    }
}

pub fn translation_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text to {} just return the translation. Text: {}",
        target_language, text
    )
}

/// Client for an OpenAI-compatible streaming `/v1/chat/completions` endpoint
pub struct ChatTranslator {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    system_prompt: String,
}

impl ChatTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build translation HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            system_prompt: config.system_prompt.clone(),
        })
    }
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate_stream(&self, text: &str, target_language: &str) -> Result<FragmentReceiver> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::text("system", self.system_prompt.clone()),
                ChatMessage::text("user", translation_prompt(text, target_language)),
            ],
            stream: true,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Translation request failed")?
            .error_for_status()
            .context("Translation endpoint returned an error")?;

        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);

        // Reader task: pushes fragments until [DONE], the body ends, or the
        // consumer goes away
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut pending: Vec<u8> = Vec::new();

            while let Some(bytes) = body.next().await {
                let bytes = match bytes {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(anyhow!("Translation stream failed: {}", e))).await;
                        return;
                    }
                };
                pending.extend_from_slice(&bytes);

                while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    match parse_sse_line(&line) {
                        SseLine::Fragment(fragment) => {
                            if tx.send(Ok(fragment)).await.is_err() {
                                return;
                            }
                        }
                        SseLine::Done => return,
                        SseLine::Skip => {}
                    }
                }
            }

            if !pending.is_empty() {
                if let SseLine::Fragment(fragment) = parse_sse_line(&String::from_utf8_lossy(&pending)) {
                    let _ = tx.send(Ok(fragment)).await;
                } else {
                    warn!("Translation stream ended without [DONE]");
                }
            }
        });

        Ok(rx)
    }
}
