//! Channel reduction and the low-pass stage.

use crate::domain::config::ChannelSelection;
use crate::domain::error::RenderError;
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};
use std::ops::Range;

/// Reduce `frames` of a planar source to one channel.
pub fn reduce_to_mono(
    channels: &[Vec<f32>],
    frames: Range<usize>,
    selection: ChannelSelection,
) -> Vec<f32> {
    match selection {
        ChannelSelection::First => channels[0][frames].to_vec(),
        ChannelSelection::Mixdown => {
            let scale = 1.0 / channels.len() as f32;
            let mut out = vec![0.0f32; frames.len()];
            for channel in channels {
                for (acc, &sample) in out.iter_mut().zip(&channel[frames.clone()]) {
                    *acc += sample;
                }
            }
            for sample in &mut out {
                *sample *= scale;
            }
            out
        }
    }
}

/// Second-order Butterworth low-pass.
pub struct LowPassFilter {
    filter: DirectForm2Transposed<f32>,
}

impl LowPassFilter {
    /// Build a low-pass at `cutoff_hz` for a signal sampled at `sample_rate`.
    ///
    /// The cutoff is clamped below Nyquist.
    pub fn new(cutoff_hz: f32, sample_rate: u32) -> Result<Self, RenderError> {
        let fs = sample_rate as f32;
        let safe_cutoff = cutoff_hz.min(fs / 2.0 - 1.0);
        if safe_cutoff <= 0.0 {
            return Err(RenderError::Filter(format!(
                "cutoff {cutoff_hz} Hz unusable at {sample_rate} Hz"
            )));
        }

        let coeffs = Coefficients::<f32>::from_params(
            Type::LowPass,
            fs.hz(),
            safe_cutoff.hz(),
            Q_BUTTERWORTH_F32,
        )
        .map_err(|e| RenderError::Filter(format!("{e:?}")))?;

        Ok(Self {
            filter: DirectForm2Transposed::<f32>::new(coeffs),
        })
    }

    /// Filter `samples` in place.
    pub fn process(&mut self, samples: &mut [f32]) {
        for sample in samples {
            let out = self.filter.run(*sample);
            // Denormal protection
            *sample = if out.abs() < 1e-20 { 0.0 } else { out };
        }
    }
}
