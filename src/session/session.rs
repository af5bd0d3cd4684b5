use super::config::SessionConfig;
use super::messages::{ClientMessage, ServerMessage};
use super::sink::ClientSink;
use super::source::{open_source, AudioInput, TranscriptFeed};
use super::stats::{SessionCounters, SessionStats};
use crate::audio::AudioIngestAdapter;
use crate::error::SessionError;
use crate::transcript::{ChunkPipeline, PipelineOutcome};
use crate::transcription::Transcriber;
use crate::translation::{spawn_translation_worker, DispatchQueue, Translator, WorkerHandle};
use axum::extract::ws::{close_code, Message, WebSocket};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Lifecycle of a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the `start` message
    Handshaking,
    /// Ingesting audio, relaying transcripts, translating chunks
    Streaming,
    /// Flushing pending text and waiting for queued translations
    Draining,
    /// Terminal
    Closed,
}

/// Which side ended the live phase
#[derive(Debug)]
enum LiveEnd {
    ClientStopped,
    SourceEnded,
}

/// One client connection of the translation gateway
pub struct LiveSession {
    id: Uuid,
    config: Arc<SessionConfig>,
    transcriber: Arc<dyn Transcriber>,
    translator: Arc<dyn Translator>,
    state: SessionState,
    counters: SessionCounters,
    started_at: DateTime<Utc>,
}

impl LiveSession {
    pub fn new(
        config: Arc<SessionConfig>,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            transcriber,
            translator,
            state: SessionState::Handshaking,
            counters: SessionCounters::default(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the session over an upgraded WebSocket until it closes
    pub async fn run(self, socket: WebSocket) -> SessionStats {
        let (sink, stream) = socket.split();
        self.drive(ClientSink::new(sink), stream).await
    }

    /// Run the session over any message stream / sink pair.
    ///
    /// A fatal error is reported as one `error` event followed by an
    /// abnormal close.
    pub async fn drive<S, E>(mut self, sink: ClientSink, mut stream: S) -> SessionStats
    where
        S: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: Display + Send,
    {
        let span = info_span!("live_session", id = %self.id);

        async move {
            info!("Client connected");

            match self.serve(&sink, &mut stream).await {
                Ok(()) => {
                    if let Err(e) = sink.close(close_code::NORMAL, "session complete").await {
                        debug!("Close after completion failed: {:#}", e);
                    }
                }
                Err(e) => {
                    error!("Session failed: {}", e);
                    let reason = match e {
                        SessionError::Protocol(_) => "protocol error",
                        _ => "internal error",
                    };
                    let _ = sink
                        .send(&ServerMessage::Error {
                            message: e.to_string(),
                        })
                        .await;
                    let _ = sink.close(e.close_code(), reason).await;
                }
            }

            self.transition(SessionState::Closed);
            let stats = self.counters.snapshot(self.started_at);
            info!(?stats, "Session closed");
            stats
        }
        .instrument(span)
        .await
    }

    fn transition(&mut self, next: SessionState) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    async fn serve<S, E>(&mut self, sink: &ClientSink, stream: &mut S) -> Result<(), SessionError>
    where
        S: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: Display + Send,
    {
        let Some(target_language) = handshake(stream).await? else {
            info!("Client left during handshake");
            return Ok(());
        };
        info!("Session started (target_language={})", target_language);

        let (input, feed) = open_source(&self.config, &self.transcriber)
            .await
            .map_err(SessionError::upstream)?;

        sink.send(&ServerMessage::status("listening"))
            .await
            .map_err(SessionError::transport)?;

        let (queue, mut worker) =
            spawn_translation_worker(Arc::clone(&self.translator), target_language, sink.clone());
        self.transition(SessionState::Streaming);

        let result = self
            .stream_and_drain(sink, stream, input, feed, &queue, &mut worker)
            .await;
        if result.is_err() {
            worker.abort();
        }
        result
    }

    async fn stream_and_drain<S, E>(
        &mut self,
        sink: &ClientSink,
        stream: &mut S,
        mut input: AudioInput,
        mut feed: TranscriptFeed,
        queue: &DispatchQueue,
        worker: &mut WorkerHandle,
    ) -> Result<(), SessionError>
    where
        S: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: Display + Send,
    {
        let mut pipeline = ChunkPipeline::new(&self.config.segmenter, Instant::now());

        // First side to finish ends the live phase; the other is dropped
        let end = {
            let counters = &self.counters;
            let ingest = ingest_client(stream, &mut input, counters);
            let consume = consume_transcripts(&mut feed, &mut pipeline, sink, queue, counters);

            tokio::select! {
                res = ingest => res.map(|_| LiveEnd::ClientStopped),
                res = consume => res.map(|_| LiveEnd::SourceEnded),
                res = &mut *worker => Err(worker_exit(res)),
            }
        }?;

        info!("Live phase ended: {:?}", end);
        self.transition(SessionState::Draining);

        drop(feed);
        if let Err(e) = input.close().await {
            debug!("Closing transcript source failed: {:#}", e);
        }

        route_outcome(pipeline.finish(Instant::now()), queue, &self.counters)?;
        queue.shutdown()?;

        let translated = match (&mut *worker).await {
            Ok(result) => result?,
            Err(e) => return Err(worker_exit(Err(e))),
        };
        self.counters
            .chunks_translated
            .store(translated, std::sync::atomic::Ordering::Relaxed);

        if let Err(e) = sink.send(&ServerMessage::status("stopped")).await {
            debug!("Final status not delivered: {:#}", e);
        }
        Ok(())
    }
}

/// Wait for the `start` message.
///
/// `Ok(None)` means the client went away first.
async fn handshake<S, E>(stream: &mut S) -> Result<Option<String>, SessionError>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let message = match stream.next().await {
            None => return Ok(None),
            Some(Err(e)) => {
                debug!("Receive failed during handshake: {}", e);
                return Ok(None);
            }
            Some(Ok(message)) => message,
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return Ok(None),
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Binary(_) => {
                return Err(SessionError::Protocol(
                    "expected a JSON start message".to_string(),
                ))
            }
        };

        return match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Start { target_language }) => {
                let target_language = target_language.trim();
                if target_language.is_empty() {
                    Err(SessionError::Protocol(
                        "start message requires a target_language".to_string(),
                    ))
                } else {
                    Ok(Some(target_language.to_string()))
                }
            }
            Ok(_) => Err(SessionError::Protocol(
                "first message must be start".to_string(),
            )),
            Err(e) => Err(SessionError::Protocol(format!("invalid start message: {}", e))),
        };
    }
}

/// Forward client audio into the transcript source until stop or disconnect
async fn ingest_client<S, E>(
    stream: &mut S,
    input: &mut AudioInput,
    counters: &SessionCounters,
) -> Result<(), SessionError>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let ingest = AudioIngestAdapter;

    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Client receive failed: {}", e);
                break;
            }
        };

        let message = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(m) => m,
            Err(e) => {
                debug!("Dropping malformed client message: {}", e);
                continue;
            }
        };

        match message {
            ClientMessage::Audio { data } => {
                let Some(pcm) = ingest.decode(&data) else {
                    continue;
                };
                SessionCounters::bump(&counters.audio_frames);
                input.append(&pcm).await.map_err(SessionError::upstream)?;
            }
            ClientMessage::Stop => {
                info!("Client requested stop");
                input.commit().await.map_err(SessionError::upstream)?;
                return Ok(());
            }
            ClientMessage::Start { .. } => debug!("Ignoring repeated start message"),
        }
    }

    info!("Client disconnected");
    Ok(())
}

/// Relay transcript deltas to the client and feed them through the chunk pipeline
async fn consume_transcripts(
    feed: &mut TranscriptFeed,
    pipeline: &mut ChunkPipeline,
    sink: &ClientSink,
    queue: &DispatchQueue,
    counters: &SessionCounters,
) -> Result<(), SessionError> {
    while let Some(event) = feed.next().await.map_err(SessionError::upstream)? {
        if event.text.is_empty() && !event.is_final {
            continue;
        }

        if !event.text.is_empty() {
            sink.send(&ServerMessage::TranscriptDelta {
                text: event.text.clone(),
            })
            .await
            .map_err(SessionError::transport)?;
            SessionCounters::bump(&counters.transcript_deltas);
        }

        route_outcome(pipeline.accept(&event, Instant::now()), queue, counters)?;
    }

    info!("Transcript source ended");
    Ok(())
}

fn route_outcome(
    outcome: PipelineOutcome,
    queue: &DispatchQueue,
    counters: &SessionCounters,
) -> Result<(), SessionError> {
    match outcome {
        PipelineOutcome::Pending => {}
        PipelineOutcome::Admitted(chunk) => {
            debug!("Enqueueing chunk ({} chars)", chunk.raw.chars().count());
            SessionCounters::bump(&counters.chunks_enqueued);
            queue.enqueue(chunk.raw)?;
        }
        PipelineOutcome::Duplicate(chunk) => {
            debug!("Skipping recently seen chunk: {}", chunk.normalized);
            SessionCounters::bump(&counters.chunks_duplicate);
        }
        PipelineOutcome::Discarded(text) => {
            debug!("Discarding chunk without content: {:?}", text);
            SessionCounters::bump(&counters.chunks_discarded);
        }
    }
    Ok(())
}

fn worker_exit(result: Result<Result<usize, SessionError>, JoinError>) -> SessionError {
    match result {
        Ok(Err(e)) => e,
        Ok(Ok(_)) => SessionError::Translation("translation worker stopped early".to_string()),
        Err(e) => SessionError::Translation(format!("translation worker failed: {}", e)),
    }
}
