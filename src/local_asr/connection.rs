use super::server::LocalAsrState;
use crate::audio::AudioIngestAdapter;
use crate::session::ClientSink;
use crate::transcription::WindowPoller;
use crate::upstream::{RealtimeCommand, RealtimeServerEvent};
use axum::extract::ws::{close_code, Message};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

const EVENT_BUFFER: usize = 16;

/// How the client side of a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientEnd {
    /// Sent commit or stop; still listening for the final transcript
    Finished,
    /// Closed or dropped the connection
    Gone,
}

/// Serve one realtime connection until the client commits, stops or leaves.
///
/// A final transcription of the buffered window is sent as
/// `transcript.final` before closing, unless the client is already gone.
pub async fn serve_connection<S, E>(state: LocalAsrState, path: String, sink: ClientSink, mut stream: S)
where
    S: Stream<Item = Result<Message, E>> + Unpin + Send,
    E: Display + Send,
{
    let span = info_span!("asr_connection", id = %Uuid::new_v4());

    async move {
        info!("Client connected path={}", path);

        let buffer = state.window.new_buffer();
        let poller = WindowPoller::new(
            Arc::clone(&buffer),
            Arc::clone(&state.transcriber),
            state.window.clone(),
        );
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);
        let (stop_tx, stop_rx) = oneshot::channel();
        let poller = tokio::spawn(poller.run(events_tx, stop_rx));

        let ingest = AudioIngestAdapter;
        let mut end = ClientEnd::Gone;

        loop {
            tokio::select! {
                message = stream.next() => {
                    let text = match message {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            warn!("Client receive failed: {}", e);
                            break;
                        }
                    };

                    match serde_json::from_str::<RealtimeCommand>(&text) {
                        Ok(RealtimeCommand::AppendAudio { audio }) => {
                            if let Some(pcm) = ingest.decode(&audio) {
                                let mut buffer = buffer.lock().await;
                                buffer.append(&pcm);
                                debug!("Buffered {} bytes", buffer.len());
                            }
                        }
                        Ok(RealtimeCommand::CommitAudio) | Ok(RealtimeCommand::Stop) => {
                            end = ClientEnd::Finished;
                            break;
                        }
                        Ok(other) => debug!("Ignored message {:?}", other),
                        Err(e) => debug!("Dropping malformed message: {}", e),
                    }
                }
                Some(event) = events_rx.recv() => {
                    let delta = RealtimeServerEvent::TranscriptDelta { delta: event.text };
                    if let Err(e) = sink.send(&delta).await {
                        warn!("Client send failed: {:#}", e);
                        break;
                    }
                }
            }
        }

        // The poller drops its sender on exit, which ends this drain
        let _ = stop_tx.send(());
        while let Some(event) = events_rx.recv().await {
            if end == ClientEnd::Finished {
                let delta = RealtimeServerEvent::TranscriptDelta { delta: event.text };
                if let Err(e) = sink.send(&delta).await {
                    debug!("Late delta not delivered: {:#}", e);
                }
            }
        }

        let mut poller = match poller.await {
            Ok(poller) => poller,
            Err(e) => {
                warn!("Window poller failed: {}", e);
                return;
            }
        };

        if end == ClientEnd::Finished {
            if let Some(text) = poller.finalize().await {
                info!("Final transcript ({} chars)", text.chars().count());
                if let Err(e) = sink.send(&RealtimeServerEvent::TranscriptFinal { text }).await {
                    debug!("Final transcript not delivered: {:#}", e);
                }
            }
            if let Err(e) = sink.close(close_code::NORMAL, "").await {
                debug!("Close failed: {:#}", e);
            }
        }

        info!("Client disconnected");
    }
    .instrument(span)
    .await
}
