pub mod buffer;
pub mod ingest;
pub mod source;
pub mod wav;

pub use buffer::SlidingWindowBuffer;
pub use ingest::AudioIngestAdapter;
pub use source::AudioSource;
pub use wav::pcm16_to_wav;

/// Bytes per PCM16 mono sample
pub const BYTES_PER_SAMPLE: usize = 2;
