mod common;

use anyhow::{Context, Result};
use axum::extract::ws::Message;
use common::{client_pair, close_code, silence_b64, text, ScriptedTranscriber};
use futures::StreamExt;
use live_translate::local_asr::{create_local_asr_router, serve_connection, LocalAsrState};
use live_translate::transcription::WindowConfig;
use live_translate::upstream::RealtimeServerEvent;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;

fn state(transcriber: Arc<ScriptedTranscriber>, interval_secs: f64) -> LocalAsrState {
    LocalAsrState::new(
        transcriber,
        WindowConfig {
            interval_secs,
            min_audio_secs: 0.1,
            ..Default::default()
        },
        "/v1/realtime".to_string(),
    )
}

fn events(frames: &[Message]) -> Vec<RealtimeServerEvent> {
    frames
        .iter()
        .filter_map(|m| match m {
            Message::Text(t) => serde_json::from_str(t).ok(),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_commit_sends_final_transcript() -> Result<()> {
    // Long interval: only the closing pass transcribes
    let transcriber = ScriptedTranscriber::new("hello world");
    let (client, client_rx, sink, server_rx) = client_pair();

    client.unbounded_send(text(json!({"type": "transcription_session.update", "input_audio_format": "pcm16"})))?;
    client.unbounded_send(text(json!({"type": "input_audio_buffer.append", "audio": silence_b64(4000)})))?;
    client.unbounded_send(text(json!({"type": "input_audio_buffer.commit"})))?;

    tokio::time::timeout(
        Duration::from_secs(5),
        serve_connection(state(transcriber.clone(), 60.0), "/v1/realtime".into(), sink, client_rx),
    )
    .await?;
    drop(client);
    let frames: Vec<Message> = server_rx.collect().await;

    assert_eq!(
        events(&frames),
        vec![RealtimeServerEvent::TranscriptFinal {
            text: "hello world".into()
        }]
    );
    assert_eq!(close_code(&frames), Some(1000));
    assert_eq!(transcriber.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_deltas_stream_while_audio_arrives() -> Result<()> {
    let transcriber = ScriptedTranscriber::new("hello");
    let (client, client_rx, sink, mut server_rx) = client_pair();
    let handle = tokio::spawn(serve_connection(
        state(transcriber.clone(), 0.05),
        "/v1/realtime".into(),
        sink,
        client_rx,
    ));

    client.unbounded_send(text(json!({"type": "input_audio_buffer.append", "audio": silence_b64(4000)})))?;
    let first = tokio::time::timeout(Duration::from_secs(5), server_rx.next())
        .await?
        .context("no delta")?;
    assert_eq!(
        events(&[first]),
        vec![RealtimeServerEvent::TranscriptDelta {
            delta: "hello".into()
        }]
    );

    client.unbounded_send(text(json!({"type": "stop"})))?;
    tokio::time::timeout(Duration::from_secs(5), handle).await??;
    drop(client);
    let rest: Vec<Message> = server_rx.collect().await;

    // Nothing new to say at close
    assert!(events(&rest).is_empty());
    assert_eq!(close_code(&rest), Some(1000));
    Ok(())
}

#[tokio::test]
async fn test_client_disconnect_skips_final() -> Result<()> {
    let transcriber = ScriptedTranscriber::new("unheard");
    let (client, client_rx, sink, server_rx) = client_pair();

    client.unbounded_send(text(json!({"type": "input_audio_buffer.append", "audio": silence_b64(4000)})))?;
    client.unbounded_send(Ok(Message::Close(None)))?;

    serve_connection(state(transcriber.clone(), 60.0), "/v1/realtime".into(), sink, client_rx).await;
    drop(client);
    let frames: Vec<Message> = server_rx.collect().await;

    assert!(frames.is_empty());
    assert_eq!(transcriber.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_wrong_path_closed_with_policy_violation() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let router = create_local_asr_router(state(ScriptedTranscriber::new(""), 0.7));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let (mut ws, _) = connect_async(format!("ws://{}/not-realtime", addr)).await?;
    let mut code = None;
    while let Some(Ok(message)) = ws.next().await {
        if let tokio_tungstenite::tungstenite::Message::Close(Some(frame)) = message {
            code = Some(u16::from(frame.code));
        }
    }
    assert_eq!(code, Some(1008));

    // The realtime prefix is accepted
    let (mut ws, _) = connect_async(format!("ws://{}/v1/realtime?intent=transcription", addr)).await?;
    ws.close(None).await?;
    Ok(())
}
