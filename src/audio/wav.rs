//! WAV export of synthesized tone buffers.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::tone::ToneBuffer;
use crate::error::AudioError;

/// Write `buffer` as a mono 32-bit float WAV file.
pub fn write_tone_wav<P: AsRef<Path>>(buffer: &ToneBuffer, path: P) -> Result<(), AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    for &sample in &buffer.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    log::info!(
        "[ToneExport] Wrote {} samples ({} Hz @ {:.1} dB) to {:?}",
        buffer.samples.len(),
        buffer.frequency_hz,
        buffer.loudness_db,
        path.as_ref()
    );
    Ok(())
}
