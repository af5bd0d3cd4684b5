use anyhow::{Context, Result};
use std::io::Cursor;

use super::BYTES_PER_SAMPLE;

/// Wrap little-endian PCM16 mono bytes in a WAV container.
///
/// A trailing odd byte is ignored.
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut out = Vec::with_capacity(pcm.len() + 44);
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut out), spec)
            .context("Failed to create WAV writer")?;

        for sample in pcm.chunks_exact(BYTES_PER_SAMPLE) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV")?;
    }

    Ok(out)
}
