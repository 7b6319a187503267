//! WAV decoding into a planar `AudioBuffer`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use beat_broker::AudioBuffer;
use hound::{SampleFormat, WavReader};
use tracing::debug;

/// Read a WAV file, converting integer PCM to `[-1, 1]` floats.
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode float samples")?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("Unsupported bit depth: {}", spec.bits_per_sample);
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
    };

    debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = samples.len(),
        "Decoded WAV file"
    );

    AudioBuffer::from_interleaved(&samples, usize::from(spec.channels), spec.sample_rate)
        .with_context(|| format!("Unusable audio in {}", path.display()))
}
