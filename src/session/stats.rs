use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Summary of a finished live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// When the connection was accepted
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Audio frames accepted from the client
    pub audio_frames: usize,

    /// Transcript deltas forwarded to the client
    pub transcript_deltas: usize,

    /// Chunks admitted for translation
    pub chunks_enqueued: usize,

    /// Chunks dropped as recent duplicates
    pub chunks_duplicate: usize,

    /// Chunks dropped for lack of alphanumeric content
    pub chunks_discarded: usize,

    /// Chunks the translation worker finished
    pub chunks_translated: usize,
}

/// Live counters updated by the concurrently running parts of a session
#[derive(Debug, Default)]
pub struct SessionCounters {
    pub audio_frames: AtomicUsize,
    pub transcript_deltas: AtomicUsize,
    pub chunks_enqueued: AtomicUsize,
    pub chunks_duplicate: AtomicUsize,
    pub chunks_discarded: AtomicUsize,
    pub chunks_translated: AtomicUsize,
}

impl SessionCounters {
    pub fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, started_at: DateTime<Utc>) -> SessionStats {
        let duration = Utc::now().signed_duration_since(started_at);

        SessionStats {
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            audio_frames: self.audio_frames.load(Ordering::Relaxed),
            transcript_deltas: self.transcript_deltas.load(Ordering::Relaxed),
            chunks_enqueued: self.chunks_enqueued.load(Ordering::Relaxed),
            chunks_duplicate: self.chunks_duplicate.load(Ordering::Relaxed),
            chunks_discarded: self.chunks_discarded.load(Ordering::Relaxed),
            chunks_translated: self.chunks_translated.load(Ordering::Relaxed),
        }
    }
}
