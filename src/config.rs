use anyhow::{ensure, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::transcript::SegmenterConfig;
use crate::transcription::WindowConfig;

/// Environment variable prefix, e.g. `LIVE_TRANSLATE__WHISPER__BASE_URL`
const ENV_PREFIX: &str = "LIVE_TRANSLATE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub gateway: GatewayConfig,
    pub realtime: RealtimeConfig,
    pub whisper: WhisperConfig,
    pub translation: TranslationConfig,
    pub segmenter: SegmenterConfig,
    pub window: WindowConfig,
    pub local_asr: LocalAsrConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub log_level: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "live-translate".to_string(),
            log_level: "info".to_string(),
            http: HttpConfig {
                bind: "0.0.0.0".to_string(),
                port: 8080,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl HttpConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Where the gateway gets its transcript from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Relay audio to a realtime ASR service and consume its events
    #[default]
    Relay,
    /// Re-transcribe a trailing audio window in-process
    Windowed,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub source: SourceKind,
}

/// Realtime ASR upstream used in relay mode
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub prompt: String,
    pub language: Option<String>,
    pub input_audio_format: String,
    pub turn_detection: TurnDetectionConfig,
    pub noise_reduction: String,
    pub connect_timeout_secs: u64,
}

impl RealtimeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: "wss://api.openai.com/v1/realtime?intent=transcription".to_string(),
            api_key: None,
            model: "gpt-4o-transcribe".to_string(),
            prompt: String::new(),
            language: None,
            input_audio_format: "pcm16".to_string(),
            turn_detection: TurnDetectionConfig::default(),
            noise_reduction: "near_field".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TurnDetectionConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for TurnDetectionConfig {
    fn default() -> Self {
        Self {
            kind: "server_vad".to_string(),
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// OpenAI-compatible Whisper endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhisperConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            model: "openai/whisper-large-v3".to_string(),
            api_key: "EMPTY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// OpenAI-compatible chat completion endpoint used for translation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub system_prompt: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            model: "google/gemma-3-4b-it".to_string(),
            api_key: "EMPTY".to_string(),
            timeout_secs: 3600,
            system_prompt: "You are a helpful translation assistant.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalAsrConfig {
    pub http: HttpConfig,
    pub path_prefix: String,
}

impl Default for LocalAsrConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                bind: "0.0.0.0".to_string(),
                port: 8002,
            },
            path_prefix: "/v1/realtime".to_string(),
        }
    }
}

impl Config {
    /// Load from an optional config file, overridden by `LIVE_TRANSLATE__*` env vars
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.window.sample_rate > 0, "window.sample_rate must be positive");
        ensure!(
            self.window.window_secs.is_finite() && self.window.window_secs > 0.0,
            "window.window_secs must be a positive number"
        );
        ensure!(
            self.window.interval_secs.is_finite() && self.window.interval_secs > 0.0,
            "window.interval_secs must be a positive number"
        );
        ensure!(
            self.window.min_audio_secs.is_finite() && self.window.min_audio_secs >= 0.0,
            "window.min_audio_secs must be zero or more"
        );
        ensure!(self.segmenter.history_size > 0, "segmenter.history_size must be positive");
        ensure!(
            self.local_asr.path_prefix.starts_with('/'),
            "local_asr.path_prefix must start with '/'"
        );
        Ok(())
    }
}
