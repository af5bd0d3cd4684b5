use serde::{Deserialize, Serialize};

use crate::config::RealtimeConfig;

/// Client-to-service messages of the realtime transcription protocol.
///
/// Sent by the gateway to its upstream, and accepted by the local
/// windowed server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RealtimeCommand {
    #[serde(rename = "transcription_session.update")]
    SessionUpdate(SessionUpdate),

    #[serde(rename = "input_audio_buffer.append")]
    AppendAudio {
        /// Base64 PCM16
        #[serde(default)]
        audio: String,
    },

    #[serde(rename = "input_audio_buffer.commit")]
    CommitAudio,

    #[serde(rename = "stop")]
    Stop,

    /// Any other type tag
    #[serde(other)]
    Unknown,
}

/// Transcription session setup, sent once after connecting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub input_audio_format: String,
    pub input_audio_transcription: AudioTranscription,
    pub turn_detection: TurnDetection,
    pub input_audio_noise_reduction: NoiseReduction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTranscription {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseReduction {
    #[serde(rename = "type")]
    pub kind: String,
}

impl SessionUpdate {
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            input_audio_format: config.input_audio_format.clone(),
            input_audio_transcription: AudioTranscription {
                model: config.model.clone(),
                prompt: config.prompt.clone(),
                language: config.language.clone(),
            },
            turn_detection: TurnDetection {
                kind: config.turn_detection.kind.clone(),
                threshold: config.turn_detection.threshold,
                prefix_padding_ms: config.turn_detection.prefix_padding_ms,
                silence_duration_ms: config.turn_detection.silence_duration_ms,
            },
            input_audio_noise_reduction: NoiseReduction {
                kind: config.noise_reduction.clone(),
            },
        }
    }
}

/// Events emitted by the local windowed transcription server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RealtimeServerEvent {
    #[serde(rename = "transcript.delta")]
    TranscriptDelta { delta: String },

    #[serde(rename = "transcript.final")]
    TranscriptFinal { text: String },
}
