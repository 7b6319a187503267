//! Window rendering: extract, reduce to mono, low-pass, optionally resample.
//!
//! The rendered signal emphasises the low-frequency content that carries the
//! beat. Rendering runs on the blocking pool so callers are never stalled by
//! filter work.

pub mod filter;
pub mod resample;

use crate::domain::audio::AudioBuffer;
use crate::domain::config::RenderConfig;
use crate::domain::error::RenderError;
use async_trait::async_trait;
use std::ops::Range;
use tracing::debug;

pub use filter::{reduce_to_mono, LowPassFilter};
pub use resample::resample_mono;

/// Mono signal ready to be sent to the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAudio {
    /// Filtered samples. Moved into the request on send.
    pub channel_data: Vec<f32>,
    /// Rate of `channel_data` in Hz.
    pub sample_rate: u32,
}

/// Produces the analysed signal for a window of a source buffer.
///
/// Offsets and durations are in seconds. Implementations must fail when
/// either is negative or when the window runs past the end of the source, and
/// must hand back a buffer no other request aliases.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        source: &AudioBuffer,
        offset: f64,
        duration: f64,
    ) -> Result<RenderedAudio, RenderError>;
}

/// Default renderer: first-channel (or mixdown) 240 Hz low-pass.
#[derive(Debug, Clone, Default)]
pub struct OfflineRenderer {
    config: RenderConfig,
}

impl OfflineRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Renderer for OfflineRenderer {
    async fn render(
        &self,
        source: &AudioBuffer,
        offset: f64,
        duration: f64,
    ) -> Result<RenderedAudio, RenderError> {
        // Fail fast on the caller's task; only the DSP goes to the pool.
        window_frames(source, offset, duration)?;

        let source = source.clone();
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || render_window(&source, offset, duration, &config))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))?
    }
}

/// Frame range covered by `[offset, offset + duration)` seconds.
pub fn window_frames(
    source: &AudioBuffer,
    offset: f64,
    duration: f64,
) -> Result<Range<usize>, RenderError> {
    let source_duration = source.duration();
    let invalid = || RenderError::InvalidWindow {
        offset,
        duration,
        source_duration,
    };

    if !offset.is_finite() || !duration.is_finite() || offset < 0.0 || duration < 0.0 {
        return Err(invalid());
    }

    let sample_rate = f64::from(source.sample_rate());
    // Half a sample of slack absorbs float error in callers' arithmetic.
    let tolerance = 0.5 / sample_rate;
    if offset + duration > source_duration + tolerance {
        return Err(invalid());
    }

    let start = ((offset * sample_rate).round() as usize).min(source.length());
    let frames = (duration * sample_rate).round() as usize;
    let end = (start + frames).min(source.length());

    Ok(start..end)
}

/// Synchronous rendering, for callers that already run off the async runtime.
pub fn render_window(
    source: &AudioBuffer,
    offset: f64,
    duration: f64,
    config: &RenderConfig,
) -> Result<RenderedAudio, RenderError> {
    let frames = window_frames(source, offset, duration)?;
    let mut channel_data = reduce_to_mono(source.channels(), frames.clone(), config.channel);

    LowPassFilter::new(config.lowpass_cutoff_hz, source.sample_rate())?.process(&mut channel_data);

    let sample_rate = match config.target_sample_rate {
        Some(target) if target != source.sample_rate() => {
            let expected = (duration * f64::from(target)).round() as usize;
            channel_data = resample_mono(&channel_data, source.sample_rate(), target, expected)?;
            target
        }
        _ => source.sample_rate(),
    };

    debug!(
        start_frame = frames.start,
        samples = channel_data.len(),
        sample_rate = sample_rate,
        "Rendered analysis window"
    );

    Ok(RenderedAudio {
        channel_data,
        sample_rate,
    })
}
