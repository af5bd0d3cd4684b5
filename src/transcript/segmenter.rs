use serde::Deserialize;
use std::time::{Duration, Instant};

/// Thresholds for turning transcript deltas into translatable chunks
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Flush once pending text reaches this many characters
    pub max_chars: usize,

    /// Flush once this long has passed since the previous flush
    pub flush_interval_ms: u64,

    /// Minimum alphanumeric characters for a chunk to be worth translating
    pub min_alnum: usize,

    /// Capacity of the recent-chunk dedup history
    pub history_size: usize,
}

impl SegmenterConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_chars: 40,
            flush_interval_ms: 700,
            min_alnum: 2,
            history_size: 6,
        }
    }
}

/// Accumulates deltas and decides when the pending text becomes a chunk
#[derive(Debug)]
pub struct ChunkSegmenter {
    max_chars: usize,
    flush_interval: Duration,
    pending: String,
    last_flush: Instant,
}

impl ChunkSegmenter {
    pub fn new(config: &SegmenterConfig, now: Instant) -> Self {
        Self {
            max_chars: config.max_chars,
            flush_interval: config.flush_interval(),
            pending: String::new(),
            last_flush: now,
        }
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Append `delta` and flush if finality, size or elapsed time says so.
    ///
    /// A flush returns the trimmed pending text (possibly empty), clears the
    /// buffer and restarts the interval clock.
    pub fn push(&mut self, delta: &str, is_final: bool, now: Instant) -> Option<String> {
        self.pending.push_str(delta);

        let due = is_final
            || self.pending.chars().count() >= self.max_chars
            || now.saturating_duration_since(self.last_flush) >= self.flush_interval;

        if due {
            Some(self.flush(now))
        } else {
            None
        }
    }

    /// Force out whatever is pending at session end
    pub fn finish(&mut self, now: Instant) -> Option<String> {
        if self.pending.trim().is_empty() {
            self.pending.clear();
            return None;
        }
        Some(self.flush(now))
    }

    fn flush(&mut self, now: Instant) -> String {
        let chunk = self.pending.trim().to_string();
        self.pending.clear();
        self.last_flush = now;
        chunk
    }
}
