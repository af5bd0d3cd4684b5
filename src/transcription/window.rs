use anyhow::Result;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::client::Transcriber;
use crate::audio::buffer::bytes_for;
use crate::audio::{pcm16_to_wav, AudioSource, SlidingWindowBuffer};
use crate::transcript::{TranscriptDiff, TranscriptEvent};

/// Audio buffer shared between the ingesting side and the poller
pub type SharedBuffer = Arc<Mutex<SlidingWindowBuffer>>;

/// Windowed re-transcription settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// PCM16 mono sample rate of incoming audio
    pub sample_rate: u32,

    /// Longest trailing window sent per transcription attempt
    pub window_secs: f64,

    /// Poll period, also the minimum spacing between attempts
    pub interval_secs: f64,

    /// No attempt until the buffer holds at least this much audio
    pub min_audio_secs: f64,
}

impl WindowConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs_f64(self.window_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    pub fn min_audio(&self) -> Duration {
        Duration::from_secs_f64(self.min_audio_secs)
    }

    pub fn new_buffer(&self) -> SharedBuffer {
        Arc::new(Mutex::new(SlidingWindowBuffer::new(
            self.sample_rate,
            self.window(),
        )))
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            window_secs: 12.0,
            interval_secs: 0.7,
            min_audio_secs: 0.8,
        }
    }
}

/// Decides whether a poll tick should run a transcription attempt
#[derive(Debug, Clone)]
pub struct PollGate {
    min_bytes: usize,
    interval: Duration,
    last_run: Option<Instant>,
}

impl PollGate {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            min_bytes: bytes_for(config.sample_rate, config.min_audio()),
            interval: config.interval(),
            last_run: None,
        }
    }

    pub fn should_attempt(&self, buffered_bytes: usize, now: Instant) -> bool {
        if buffered_bytes < self.min_bytes {
            return false;
        }
        match self.last_run {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_run = Some(now);
    }
}

/// Periodically re-transcribes the trailing window and emits unseen text
pub struct WindowPoller {
    buffer: SharedBuffer,
    transcriber: Arc<dyn Transcriber>,
    config: WindowConfig,
    gate: PollGate,
    diff: TranscriptDiff,
}

impl WindowPoller {
    pub fn new(buffer: SharedBuffer, transcriber: Arc<dyn Transcriber>, config: WindowConfig) -> Self {
        let gate = PollGate::new(&config);
        Self {
            buffer,
            transcriber,
            config,
            gate,
            diff: TranscriptDiff::new(),
        }
    }

    /// Full text behind the deltas emitted so far
    pub fn last_text(&self) -> &str {
        self.diff.last_text()
    }

    /// One poll tick: maybe transcribe, and return the unseen suffix if any.
    ///
    /// Transcription failures are logged and swallowed.
    pub async fn poll(&mut self, now: Instant) -> Option<TranscriptEvent> {
        let (audio, scrolled) = {
            let buffer = self.buffer.lock().await;
            if !self.gate.should_attempt(buffer.len(), now) {
                return None;
            }
            (buffer.snapshot(), buffer.has_scrolled())
        };
        self.gate.mark(now);

        let text = match self.transcribe(&audio).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Transcribe failed: {:#}", e);
                return None;
            }
        };

        if text.is_empty() {
            debug!("Empty transcription result");
            return None;
        }

        let delta = self.diff.advance(&text, scrolled)?;
        info!("Transcript delta ({} chars)", delta.chars().count());
        Some(TranscriptEvent::partial(delta))
    }

    /// Poll every interval until `stop` fires (or its sender is dropped) or
    /// `events` is closed, then hand the poller back.
    ///
    /// An attempt in flight when `stop` fires is abandoned.
    pub async fn run(
        mut self,
        events: mpsc::Sender<TranscriptEvent>,
        mut stop: oneshot::Receiver<()>,
    ) -> Self {
        let period = self.config.interval();
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let event = tokio::select! {
                        _ = &mut stop => break,
                        event = self.poll(Instant::now()) => event,
                    };
                    if let Some(event) = event {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        self
    }

    /// Transcribe everything still buffered once more at close.
    ///
    /// Returns the unseen text, if any. Failures are logged.
    pub async fn finalize(&mut self) -> Option<String> {
        let (audio, scrolled) = {
            let buffer = self.buffer.lock().await;
            (buffer.snapshot(), buffer.has_scrolled())
        };
        if audio.is_empty() {
            return None;
        }

        match self.transcribe(&audio).await {
            Ok(text) if !text.is_empty() => self.diff.advance(&text, scrolled),
            Ok(_) => None,
            Err(e) => {
                warn!("Final transcribe failed: {:#}", e);
                None
            }
        }
    }

    async fn transcribe(&self, pcm: &[u8]) -> Result<String> {
        let wav = pcm16_to_wav(pcm, self.config.sample_rate)?;
        self.transcriber.transcribe(AudioSource::Memory(wav)).await
    }
}
