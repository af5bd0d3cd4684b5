//! Transcript processing
//!
//! Turns upstream transcription output into translatable chunks:
//! - `extract`: normalize upstream events or successive full-text results into deltas
//! - `segmenter`: accumulate deltas until a size, time or finality threshold is hit
//! - `dedup`: drop chunks whose normalized text was seen recently
//! - `pipeline`: the three combined, as owned by a live session

mod dedup;
mod extract;
mod pipeline;
mod segmenter;

pub use dedup::{Chunk, RecentChunkHistory};
pub use extract::{delta_suffix, extract_event, TranscriptDiff, TranscriptEvent};
pub use pipeline::{ChunkPipeline, PipelineOutcome};
pub use segmenter::{ChunkSegmenter, SegmenterConfig};
