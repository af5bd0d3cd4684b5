use std::time::Instant;

use super::dedup::{Chunk, RecentChunkHistory};
use super::extract::TranscriptEvent;
use super::segmenter::{ChunkSegmenter, SegmenterConfig};

/// What happened to a transcript event on its way to translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// No flush yet, text is still pending
    Pending,
    /// Flushed, meaningful and new: enqueue for translation
    Admitted(Chunk),
    /// Flushed but seen recently
    Duplicate(Chunk),
    /// Flushed but too little alphanumeric content
    Discarded(String),
}

/// Segmenter, meaningfulness check and dedup history of one session
#[derive(Debug)]
pub struct ChunkPipeline {
    segmenter: ChunkSegmenter,
    history: RecentChunkHistory,
    min_alnum: usize,
}

impl ChunkPipeline {
    pub fn new(config: &SegmenterConfig, now: Instant) -> Self {
        Self {
            segmenter: ChunkSegmenter::new(config, now),
            history: RecentChunkHistory::new(config.history_size),
            min_alnum: config.min_alnum,
        }
    }

    pub fn history(&self) -> &RecentChunkHistory {
        &self.history
    }

    pub fn accept(&mut self, event: &TranscriptEvent, now: Instant) -> PipelineOutcome {
        let flushed = self.segmenter.push(&event.text, event.is_final, now);
        self.evaluate(flushed)
    }

    /// Flush remaining text at session end under the same rules
    pub fn finish(&mut self, now: Instant) -> PipelineOutcome {
        let flushed = self.segmenter.finish(now);
        self.evaluate(flushed)
    }

    fn evaluate(&mut self, flushed: Option<String>) -> PipelineOutcome {
        let Some(text) = flushed else {
            return PipelineOutcome::Pending;
        };

        let chunk = Chunk::new(text);
        if !chunk.is_meaningful(self.min_alnum) {
            return PipelineOutcome::Discarded(chunk.raw);
        }
        if self.history.admit(&chunk) {
            PipelineOutcome::Admitted(chunk)
        } else {
            PipelineOutcome::Duplicate(chunk)
        }
    }
}
