use anyhow::{bail, Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::messages::{RealtimeCommand, SessionUpdate};
use crate::audio::AudioIngestAdapter;
use crate::config::RealtimeConfig;
use crate::transcript::{extract_event, TranscriptEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Hosted endpoints that refuse unauthenticated connections
fn is_cloud_endpoint(url: &Url) -> bool {
    url.host_str()
        .map(|host| host == "openai.com" || host.ends_with(".openai.com"))
        .unwrap_or(false)
}

/// Live channel to the realtime ASR service
pub struct UpstreamConnection;

impl UpstreamConnection {
    /// Connect, send the session setup, and split into writer and reader halves
    pub async fn connect(config: &RealtimeConfig) -> Result<(UpstreamWriter, UpstreamReader)> {
        let url = Url::parse(&config.url)
            .with_context(|| format!("Invalid realtime URL: {}", config.url))?;
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        if api_key.is_none() && is_cloud_endpoint(&url) {
            bail!("Missing API key for realtime endpoint {}", url);
        }

        let mut request = url
            .as_str()
            .into_client_request()
            .context("Failed to build realtime request")?;
        if let Some(key) = api_key {
            let headers = request.headers_mut();
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .context("Invalid API key header")?,
            );
            headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));
        }

        info!("Connecting to realtime upstream at {}", url);

        let (ws, _) = tokio::time::timeout(config.connect_timeout(), connect_async(request))
            .await
            .context("Timed out connecting to realtime upstream")?
            .context("Failed to connect to realtime upstream")?;

        info!("Connected to realtime upstream");

        let (sink, stream) = ws.split();
        let mut writer = UpstreamWriter {
            sink,
            encoder: AudioIngestAdapter,
        };
        writer
            .send(&RealtimeCommand::SessionUpdate(SessionUpdate::from_config(config)))
            .await
            .context("Failed to send session update")?;

        Ok((writer, UpstreamReader { stream }))
    }
}

/// Sending half: audio frames and commits
pub struct UpstreamWriter {
    sink: SplitSink<WsStream, Message>,
    encoder: AudioIngestAdapter,
}

impl UpstreamWriter {
    async fn send(&mut self, command: &RealtimeCommand) -> Result<()> {
        let payload = serde_json::to_string(command)?;
        self.sink
            .send(Message::Text(payload))
            .await
            .context("Upstream send failed")
    }

    pub async fn append_audio(&mut self, pcm: &[u8]) -> Result<()> {
        let audio = self.encoder.encode(pcm);
        self.send(&RealtimeCommand::AppendAudio { audio }).await
    }

    pub async fn commit(&mut self) -> Result<()> {
        debug!("Committing upstream audio buffer");
        self.send(&RealtimeCommand::CommitAudio).await
    }

    pub async fn close(mut self) -> Result<()> {
        info!("Closing realtime upstream");
        self.sink.close().await.context("Failed to close upstream")
    }
}

/// Receiving half: transcript events
pub struct UpstreamReader {
    stream: SplitStream<WsStream>,
}

impl UpstreamReader {
    /// Next transcript-bearing event, or `None` once the upstream closes.
    ///
    /// Non-JSON frames and unrecognized event types are skipped.
    pub async fn next_event(&mut self) -> Result<Option<TranscriptEvent>> {
        while let Some(message) = self.stream.next().await {
            let text = match message.context("Upstream receive failed")? {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    info!("Realtime upstream closed: {:?}", frame);
                    return Ok(None);
                }
                _ => continue,
            };

            let value: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    debug!("Dropping non-JSON upstream frame: {}", e);
                    continue;
                }
            };

            let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
            if kind == "error" {
                warn!("Realtime upstream reported an error: {}", value["error"]);
                continue;
            }

            match extract_event(&value) {
                Some(event) => return Ok(Some(event)),
                None => debug!("Ignoring upstream event type={}", kind),
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_endpoint_detection() {
        let cloud = Url::parse("wss://api.openai.com/v1/realtime?intent=transcription").unwrap();
        let local = Url::parse("ws://localhost:8002/v1/realtime").unwrap();
        assert!(is_cloud_endpoint(&cloud));
        assert!(!is_cloud_endpoint(&local));
    }

    #[tokio::test]
    async fn test_cloud_endpoint_without_key_fails_before_connecting() {
        let config = RealtimeConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        let err = UpstreamConnection::connect(&config).await.err().unwrap();
        assert!(err.to_string().contains("Missing API key"));
    }
}
