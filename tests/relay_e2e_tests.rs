mod common;

use anyhow::{Context, Result};
use common::{ScriptedTranscriber, UppercaseTranslator};
use futures::{SinkExt, StreamExt};
use live_translate::config::{RealtimeConfig, SourceKind};
use live_translate::session::{ServerMessage, SessionConfig};
use live_translate::{create_router, AppState};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, connect_async};
use tower::ServiceExt;

/// Realtime upstream stand-in: records every command it receives and
/// answers the first audio append with a completed transcript.
async fn spawn_mock_upstream() -> Result<(SocketAddr, mpsc::UnboundedReceiver<Value>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = accept_async(stream).await else {
            return;
        };
        let mut answered = false;

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(&text) else {
                continue;
            };

            if value["type"] == "input_audio_buffer.append" && !answered {
                answered = true;
                let events = [
                    json!({"type": "input_audio_buffer.speech_started"}),
                    json!({
                        "type": "conversation.item.input_audio_transcription.completed",
                        "transcript": "Bonjour tout le monde"
                    }),
                ];
                for event in events {
                    if ws.send(Message::Text(event.to_string())).await.is_err() {
                        return;
                    }
                }
            }
            let _ = seen_tx.send(value);
        }
    });

    Ok((addr, seen_rx))
}

/// Upstream that sends a single delta after the session setup, then closes
async fn spawn_closing_upstream(delta: &'static str) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = accept_async(stream).await else {
            return;
        };

        // Session update comes first
        let _ = ws.next().await;
        let event = json!({"type": "transcript.delta", "delta": delta});
        if ws.send(Message::Text(event.to_string())).await.is_err() {
            return;
        }
        let _ = ws.close(None).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    Ok(addr)
}

async fn spawn_gateway(config: SessionConfig) -> Result<SocketAddr> {
    let state = AppState::new(
        config,
        ScriptedTranscriber::new(""),
        Arc::new(UppercaseTranslator),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, create_router(state)).await;
    });
    Ok(addr)
}

fn parse(message: &Message) -> Option<ServerMessage> {
    match message {
        Message::Text(text) => serde_json::from_str(text).ok(),
        _ => None,
    }
}

#[tokio::test]
async fn test_relay_session_end_to_end() -> Result<()> {
    let (upstream_addr, mut upstream_seen) = spawn_mock_upstream().await?;
    let config = SessionConfig {
        source: SourceKind::Relay,
        realtime: RealtimeConfig {
            url: format!("ws://{}/v1/realtime", upstream_addr),
            api_key: None,
            ..Default::default()
        },
        ..Default::default()
    };
    let gateway = spawn_gateway(config).await?;

    let (mut client, _) = connect_async(format!("ws://{}/ws/live", gateway)).await?;
    client
        .send(Message::Text(
            json!({"type": "start", "target_language": "en"}).to_string(),
        ))
        .await?;
    client
        .send(Message::Text(
            json!({"type": "audio", "data": "AAECAw=="}).to_string(),
        ))
        .await?;

    let mut received = Vec::new();
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .context("timed out waiting for translation")?
            .context("gateway closed early")??;
        if let Some(message) = parse(&message) {
            let done = matches!(&message, ServerMessage::TranslationDelta { text } if text == "BONJOUR TOUT LE MONDE");
            received.push(message);
            if done {
                break;
            }
        }
    }

    client
        .send(Message::Text(json!({"type": "stop"}).to_string()))
        .await?;
    let mut close_code = None;
    while let Some(Ok(message)) = client.next().await {
        if let Message::Close(Some(frame)) = &message {
            close_code = Some(u16::from(frame.code));
        }
        if let Some(message) = parse(&message) {
            received.push(message);
        }
    }

    assert_eq!(received[0], ServerMessage::status("listening"));
    assert!(received.contains(&ServerMessage::TranscriptDelta {
        text: "Bonjour tout le monde".into()
    }));
    assert!(received.contains(&ServerMessage::TranslationDelta { text: "en:".into() }));
    assert_eq!(received.last(), Some(&ServerMessage::status("stopped")));
    assert_eq!(close_code, Some(1000));

    // Upstream saw the setup, the re-encoded audio and a commit, in order
    let mut commands = Vec::new();
    while let Ok(Some(value)) =
        tokio::time::timeout(Duration::from_secs(2), upstream_seen.recv()).await
    {
        commands.push(value);
    }
    assert_eq!(commands[0]["type"], "transcription_session.update");
    assert_eq!(
        commands[0]["input_audio_transcription"]["model"],
        "gpt-4o-transcribe"
    );
    assert_eq!(commands[1]["type"], "input_audio_buffer.append");
    assert_eq!(commands[1]["audio"], "AAECAw==");
    assert_eq!(commands[2]["type"], "input_audio_buffer.commit");
    Ok(())
}

#[tokio::test]
async fn test_upstream_close_drains_session() -> Result<()> {
    let upstream = spawn_closing_upstream("hello there").await?;
    let config = SessionConfig {
        source: SourceKind::Relay,
        realtime: RealtimeConfig {
            url: format!("ws://{}/v1/realtime", upstream),
            ..Default::default()
        },
        ..Default::default()
    };
    let gateway = spawn_gateway(config).await?;

    let (mut client, _) = connect_async(format!("ws://{}/ws/live", gateway)).await?;
    client
        .send(Message::Text(
            json!({"type": "start", "target_language": "fr"}).to_string(),
        ))
        .await?;

    // No stop from the client: the upstream ending alone finishes the session
    let mut received = Vec::new();
    let mut close_code = None;
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .context("timed out waiting for the session to drain")?;
        let Some(Ok(message)) = next else {
            break;
        };
        if let Message::Close(Some(frame)) = &message {
            close_code = Some(u16::from(frame.code));
        }
        if let Some(message) = parse(&message) {
            received.push(message);
        }
    }

    assert_eq!(
        received,
        vec![
            ServerMessage::status("listening"),
            ServerMessage::TranscriptDelta { text: "hello there".into() },
            ServerMessage::TranslationDelta { text: "fr:".into() },
            ServerMessage::TranslationDelta { text: "HELLO THERE".into() },
            ServerMessage::status("stopped"),
        ]
    );
    assert_eq!(close_code, Some(1000));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_upstream_reports_error() -> Result<()> {
    // Bind then drop to get a port nothing listens on
    let unused = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
    let config = SessionConfig {
        source: SourceKind::Relay,
        realtime: RealtimeConfig {
            url: format!("ws://{}/v1/realtime", unused),
            ..Default::default()
        },
        ..Default::default()
    };
    let gateway = spawn_gateway(config).await?;

    let (mut client, _) = connect_async(format!("ws://{}/ws/live", gateway)).await?;
    client
        .send(Message::Text(
            json!({"type": "start", "target_language": "en"}).to_string(),
        ))
        .await?;

    let mut error = None;
    let mut close_code = None;
    while let Some(Ok(message)) = client.next().await {
        if let Message::Close(Some(frame)) = &message {
            close_code = Some(u16::from(frame.code));
        }
        if let Some(ServerMessage::Error { message }) = parse(&message) {
            error = Some(message);
        }
    }

    assert!(error.context("no error event")?.contains("Upstream"));
    assert_eq!(close_code, Some(1011));
    Ok(())
}

#[tokio::test]
async fn test_health_route() -> Result<()> {
    let state = AppState::new(
        SessionConfig::default(),
        ScriptedTranscriber::new(""),
        Arc::new(UppercaseTranslator),
    );
    let response = create_router(state)
        .oneshot(
            axum::http::Request::builder()
                .uri("/health")
                .body(axum::body::Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    Ok(())
}
