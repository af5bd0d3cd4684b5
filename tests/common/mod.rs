#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::channel::mpsc as fmpsc;
use live_translate::audio::AudioSource;
use live_translate::session::{ClientSink, ServerMessage};
use live_translate::transcription::Transcriber;
use live_translate::translation::{FragmentReceiver, Translator};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Transcriber returning whatever text the test currently sets
#[derive(Default)]
pub struct ScriptedTranscriber {
    text: Mutex<String>,
    calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn new(text: &str) -> Arc<Self> {
        let t = Arc::new(Self::default());
        t.set(text);
        t
    }

    pub fn set(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, audio: AudioSource) -> Result<String> {
        let wav = audio.into_bytes().await?;
        assert_eq!(&wav[..4], b"RIFF");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.lock().unwrap().clone())
    }
}

/// Transcriber that always fails
pub struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    async fn transcribe(&self, _audio: AudioSource) -> Result<String> {
        bail!("backend unavailable")
    }
}

/// Translator emitting `"<lang>:"` then the uppercased text.
///
/// Text containing "slow" is delayed, text containing "boom" fails.
pub struct UppercaseTranslator;

#[async_trait]
impl Translator for UppercaseTranslator {
    async fn translate_stream(&self, text: &str, target_language: &str) -> Result<FragmentReceiver> {
        if text.contains("boom") {
            bail!("model exploded");
        }
        let delay = if text.contains("slow") {
            Duration::from_millis(80)
        } else {
            Duration::ZERO
        };

        let (tx, rx) = mpsc::channel(4);
        let fragments = vec![format!("{}:", target_language), text.to_uppercase()];
        tokio::spawn(async move {
            for fragment in fragments {
                tokio::time::sleep(delay).await;
                if tx.send(Ok(fragment)).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

pub type ClientTx = fmpsc::UnboundedSender<Result<Message, Infallible>>;
pub type ClientRx = fmpsc::UnboundedReceiver<Result<Message, Infallible>>;

/// In-memory client connection: the test writes to `ClientTx`, the server
/// reads `ClientRx`, and server output lands in the returned receiver.
pub fn client_pair() -> (ClientTx, ClientRx, ClientSink, fmpsc::UnboundedReceiver<Message>) {
    let (client_tx, client_rx) = fmpsc::unbounded();
    let (server_tx, server_rx) = fmpsc::unbounded();
    (client_tx, client_rx, ClientSink::new(server_tx), server_rx)
}

pub fn text(value: serde_json::Value) -> Result<Message, Infallible> {
    Ok(Message::Text(value.to_string()))
}

pub fn silence_b64(bytes: usize) -> String {
    BASE64.encode(vec![0u8; bytes])
}

pub fn server_messages(frames: &[Message]) -> Vec<ServerMessage> {
    frames
        .iter()
        .filter_map(|m| match m {
            Message::Text(t) => serde_json::from_str(t).ok(),
            _ => None,
        })
        .collect()
}

pub fn close_code(frames: &[Message]) -> Option<u16> {
    frames.iter().find_map(|m| match m {
        Message::Close(Some(CloseFrame { code, .. })) => Some(*code),
        _ => None,
    })
}

pub fn translations(messages: &[ServerMessage]) -> String {
    messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::TranslationDelta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
