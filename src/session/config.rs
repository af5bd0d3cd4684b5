use crate::config::{Config, RealtimeConfig, SourceKind};
use crate::transcript::SegmenterConfig;
use crate::transcription::WindowConfig;

/// Settings shared by every live session of a gateway
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Where transcripts come from
    pub source: SourceKind,

    /// Upstream used in relay mode
    pub realtime: RealtimeConfig,

    /// Chunking and dedup thresholds
    pub segmenter: SegmenterConfig,

    /// Re-transcription window used in windowed mode
    pub window: WindowConfig,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source: config.gateway.source,
            realtime: config.realtime.clone(),
            segmenter: config.segmenter.clone(),
            window: config.window.clone(),
        }
    }
}
