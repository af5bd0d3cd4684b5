use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::client::Translator;
use crate::error::SessionError;
use crate::session::{ClientSink, ServerMessage};

#[derive(Debug)]
enum DispatchItem {
    Chunk(String),
    /// Everything queued before this has been enqueued; finish and exit
    Shutdown,
}

/// Producer side of a session's translation queue
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<DispatchItem>,
}

impl DispatchQueue {
    pub fn enqueue(&self, text: String) -> Result<(), SessionError> {
        self.tx
            .send(DispatchItem::Chunk(text))
            .map_err(|_| SessionError::Translation("translation worker is gone".to_string()))
    }

    /// Ask the worker to exit once everything already queued is translated
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.tx
            .send(DispatchItem::Shutdown)
            .map_err(|_| SessionError::Translation("translation worker is gone".to_string()))
    }
}

/// Resolves to the number of chunks translated
pub type WorkerHandle = JoinHandle<Result<usize, SessionError>>;

/// Start the single translation consumer of a session.
///
/// Chunks are translated one at a time in enqueue order, and every fragment
/// is forwarded as a `translation_delta` before the next chunk starts. A
/// failed chunk stops the worker with an error since later chunks cannot be
/// emitted out of order.
pub fn spawn_translation_worker(
    translator: Arc<dyn Translator>,
    target_language: String,
    sink: ClientSink,
) -> (DispatchQueue, WorkerHandle) {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut translated = 0usize;

        while let Some(item) = rx.recv().await {
            let text = match item {
                DispatchItem::Chunk(text) => text,
                DispatchItem::Shutdown => break,
            };

            debug!("Translating chunk ({} chars)", text.chars().count());

            let mut fragments = translator
                .translate_stream(&text, &target_language)
                .await
                .map_err(SessionError::translation)?;

            while let Some(fragment) = fragments.recv().await {
                let fragment = fragment.map_err(SessionError::translation)?;
                sink.send(&ServerMessage::TranslationDelta { text: fragment })
                    .await
                    .map_err(SessionError::transport)?;
            }

            translated += 1;
        }

        info!("Translation worker finished ({} chunks)", translated);
        Ok(translated)
    });

    (DispatchQueue { tx }, handle)
}
