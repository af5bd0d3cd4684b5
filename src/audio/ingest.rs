use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::debug;

/// Decodes client audio frames (base64 PCM16) into raw bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioIngestAdapter;

impl AudioIngestAdapter {
    /// Decode one frame. Empty or undecodable payloads are dropped.
    pub fn decode(&self, data: &str) -> Option<Vec<u8>> {
        if data.is_empty() {
            return None;
        }
        match BASE64.decode(data) {
            Ok(pcm) if !pcm.is_empty() => Some(pcm),
            Ok(_) => None,
            Err(e) => {
                debug!("Dropping undecodable audio frame: {}", e);
                None
            }
        }
    }

    /// Encode raw bytes for forwarding upstream
    pub fn encode(&self, pcm: &[u8]) -> String {
        BASE64.encode(pcm)
    }
}
