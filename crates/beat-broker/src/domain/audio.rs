//! Decoded audio handed to the broker.

use crate::domain::error::RenderError;
use std::sync::Arc;

/// Planar, decoded PCM audio.
///
/// Cloning is cheap: channel data is shared behind an `Arc`, so a buffer can
/// be handed to a blocking render task without copying samples.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Arc<Vec<Vec<f32>>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Build a buffer from planar channels.
    ///
    /// Fails when there are no channels, the channels differ in length, or
    /// the sample rate is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, RenderError> {
        if channels.is_empty() {
            return Err(RenderError::InvalidBuffer("no channels".into()));
        }
        if sample_rate == 0 {
            return Err(RenderError::InvalidBuffer("sample rate is 0".into()));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(RenderError::InvalidBuffer(
                "channels have different lengths".into(),
            ));
        }

        Ok(Self {
            channels: Arc::new(channels),
            sample_rate,
        })
    }

    /// Single-channel buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, RenderError> {
        Self::new(vec![samples], sample_rate)
    }

    /// Split interleaved samples into a planar buffer.
    pub fn from_interleaved(
        samples: &[f32],
        number_of_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, RenderError> {
        if number_of_channels == 0 {
            return Err(RenderError::InvalidBuffer("no channels".into()));
        }
        let frames = samples.len() / number_of_channels;
        let mut planar = vec![Vec::with_capacity(frames); number_of_channels];
        for frame in samples.chunks_exact(number_of_channels) {
            for (channel, &sample) in planar.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(planar, sample_rate)
    }

    /// Samples per second.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel.
    #[must_use]
    pub fn length(&self) -> usize {
        self.channels[0].len()
    }

    #[must_use]
    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// Duration in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.length() as f64 / f64::from(self.sample_rate)
    }

    /// Samples of one channel, if it exists.
    #[must_use]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub(crate) fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }
}
