use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::config::SessionConfig;
use crate::config::SourceKind;
use crate::transcript::TranscriptEvent;
use crate::transcription::{SharedBuffer, Transcriber, WindowPoller};
use crate::upstream::{UpstreamConnection, UpstreamReader, UpstreamWriter};

/// Windowed poller output buffered ahead of the session
const WINDOW_EVENT_BUFFER: usize = 16;

/// Where client audio goes
pub enum AudioInput {
    Relay(UpstreamWriter),
    Windowed(SharedBuffer),
}

impl AudioInput {
    pub async fn append(&mut self, pcm: &[u8]) -> Result<()> {
        match self {
            AudioInput::Relay(writer) => writer.append_audio(pcm).await,
            AudioInput::Windowed(buffer) => {
                buffer.lock().await.append(pcm);
                Ok(())
            }
        }
    }

    /// Signal that the client has stopped sending audio
    pub async fn commit(&mut self) -> Result<()> {
        match self {
            AudioInput::Relay(writer) => writer.commit().await,
            AudioInput::Windowed(_) => Ok(()),
        }
    }

    pub async fn close(self) -> Result<()> {
        match self {
            AudioInput::Relay(writer) => writer.close().await,
            AudioInput::Windowed(_) => Ok(()),
        }
    }
}

/// Where transcript events come from
pub enum TranscriptFeed {
    Relay(UpstreamReader),
    Windowed {
        events: mpsc::Receiver<TranscriptEvent>,
        /// Dropping this stops the poller
        _stop: oneshot::Sender<()>,
        _poller: JoinHandle<WindowPoller>,
    },
}

impl TranscriptFeed {
    /// Next event, or `None` once the source has ended
    pub async fn next(&mut self) -> Result<Option<TranscriptEvent>> {
        match self {
            TranscriptFeed::Relay(reader) => reader.next_event().await,
            TranscriptFeed::Windowed { events, .. } => Ok(events.recv().await),
        }
    }
}

/// Open the transcript source selected by `config`
pub async fn open_source(
    config: &SessionConfig,
    transcriber: &Arc<dyn Transcriber>,
) -> Result<(AudioInput, TranscriptFeed)> {
    match config.source {
        SourceKind::Relay => {
            let (writer, reader) = UpstreamConnection::connect(&config.realtime)
                .await
                .context("Failed to open realtime relay")?;
            Ok((AudioInput::Relay(writer), TranscriptFeed::Relay(reader)))
        }
        SourceKind::Windowed => {
            let buffer = config.window.new_buffer();
            let poller = WindowPoller::new(
                Arc::clone(&buffer),
                Arc::clone(transcriber),
                config.window.clone(),
            );

            let (events_tx, events_rx) = mpsc::channel(WINDOW_EVENT_BUFFER);
            let (stop_tx, stop_rx) = oneshot::channel();
            let poller = tokio::spawn(async move {
                let poller = poller.run(events_tx, stop_rx).await;
                debug!("Window poller stopped");
                poller
            });

            info!(
                "Windowed transcription started ({}s window, {}s interval)",
                config.window.window_secs, config.window.interval_secs
            );

            Ok((
                AudioInput::Windowed(buffer),
                TranscriptFeed::Windowed {
                    events: events_rx,
                    _stop: stop_tx,
                    _poller: poller,
                },
            ))
        }
    }
}
