use std::time::Duration;

use super::BYTES_PER_SAMPLE;

/// Append-only PCM16 mono buffer bounded to a trailing time window.
///
/// Oldest audio is dropped on sample boundaries once the window is full.
#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    bytes: Vec<u8>,
    max_bytes: usize,
    sample_rate: u32,
    dropped_bytes: u64,
}

impl SlidingWindowBuffer {
    pub fn new(sample_rate: u32, window: Duration) -> Self {
        let max_bytes = bytes_for(sample_rate, window).max(BYTES_PER_SAMPLE);
        Self {
            bytes: Vec::with_capacity(max_bytes),
            max_bytes,
            sample_rate,
            dropped_bytes: 0,
        }
    }

    pub fn append(&mut self, pcm: &[u8]) {
        self.bytes.extend_from_slice(pcm);

        if self.bytes.len() > self.max_bytes {
            let mut excess = self.bytes.len() - self.max_bytes;
            excess += excess % BYTES_PER_SAMPLE;
            let excess = excess.min(self.bytes.len());
            self.bytes.drain(..excess);
            self.dropped_bytes += excess as u64;
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Duration of audio currently held
    pub fn duration(&self) -> Duration {
        let samples = (self.bytes.len() / BYTES_PER_SAMPLE) as f64;
        Duration::from_secs_f64(samples / self.sample_rate as f64)
    }

    /// Whether any audio has been dropped off the front
    pub fn has_scrolled(&self) -> bool {
        self.dropped_bytes > 0
    }

    /// Copy of the retained window
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// PCM16 mono byte count for `duration` at `sample_rate`, sample aligned
pub fn bytes_for(sample_rate: u32, duration: Duration) -> usize {
    let samples = (sample_rate as f64 * duration.as_secs_f64()) as usize;
    samples * BYTES_PER_SAMPLE
}
