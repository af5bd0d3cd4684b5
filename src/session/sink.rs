use anyhow::Result;
use axum::extract::ws::{CloseFrame, Message};
use futures::{Sink, SinkExt};
use serde::Serialize;
use std::borrow::Cow;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

type BoxedSink = Pin<Box<dyn Sink<Message, Error = anyhow::Error> + Send>>;

/// The outbound half of a client connection.
///
/// Every task of a session writes through the same lock, so frames from
/// different tasks never interleave.
#[derive(Clone)]
pub struct ClientSink {
    inner: Arc<Mutex<BoxedSink>>,
}

impl ClientSink {
    pub fn new<S>(sink: S) -> Self
    where
        S: Sink<Message> + Send + 'static,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let sink = sink.sink_map_err(anyhow::Error::from);
        Self {
            inner: Arc::new(Mutex::new(Box::pin(sink))),
        }
    }

    /// Serialize `message` as JSON and send it as one text frame
    pub async fn send<T: Serialize>(&self, message: &T) -> Result<()> {
        let payload = serde_json::to_string(message)?;
        let mut sink = self.inner.lock().await;
        sink.send(Message::Text(payload)).await
    }

    /// Send a close frame and close the sink
    pub async fn close(&self, code: u16, reason: &str) -> Result<()> {
        let mut sink = self.inner.lock().await;
        sink.send(Message::Close(Some(CloseFrame {
            code,
            reason: Cow::Owned(reason.to_string()),
        })))
        .await?;
        sink.close().await
    }
}
