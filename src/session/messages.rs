use serde::{Deserialize, Serialize};

/// Messages accepted from the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Must be the first message of a session
    Start { target_language: String },

    /// One frame of base64 PCM16 audio
    Audio { data: String },

    /// End the live phase and commit what was sent
    Stop,
}

/// Messages sent to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Status { message: String },
    TranscriptDelta { text: String },
    TranslationDelta { text: String },
    Error { message: String },
}

impl ServerMessage {
    pub fn status(message: impl Into<String>) -> Self {
        ServerMessage::Status {
            message: message.into(),
        }
    }
}
