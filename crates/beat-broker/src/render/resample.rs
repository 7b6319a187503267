//! Sample-rate conversion of the rendered window.

use crate::domain::error::RenderError;
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

const CHUNK_SIZE: usize = 1024;
const MAX_FLUSH_ROUNDS: usize = 8;

fn build_resampler(src_rate: u32, dst_rate: u32) -> Result<SincFixedIn<f32>, RenderError> {
    let ratio = f64::from(dst_rate) / f64::from(src_rate);
    let sinc_len = 256usize;
    let window = WindowFunction::BlackmanHarris2;
    let f_cutoff = calculate_cutoff(sinc_len, window);
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)
        .map_err(|e| RenderError::Resample(e.to_string()))
}

/// Convert mono `input` from `src_rate` to `dst_rate`.
///
/// The output is aligned for the resampler's delay and trimmed or zero-padded
/// to exactly `expected_frames`.
pub fn resample_mono(
    input: &[f32],
    src_rate: u32,
    dst_rate: u32,
    expected_frames: usize,
) -> Result<Vec<f32>, RenderError> {
    if src_rate == dst_rate {
        let mut out = input.to_vec();
        out.resize(expected_frames, 0.0);
        return Ok(out);
    }

    let mut resampler = build_resampler(src_rate, dst_rate)?;
    let delay = resampler.output_delay();
    let wanted = expected_frames + delay;
    let mut out = Vec::with_capacity(wanted + CHUNK_SIZE);

    let mut pos = 0;
    loop {
        let need = resampler.input_frames_next();
        if input.len() - pos < need {
            break;
        }
        let block = resampler
            .process(&[&input[pos..pos + need]][..], None)
            .map_err(|e| RenderError::Resample(e.to_string()))?;
        out.extend_from_slice(&block[0]);
        pos += need;
    }

    let rest = &input[pos..];
    if !rest.is_empty() {
        let block = resampler
            .process_partial(Some(&[rest][..]), None)
            .map_err(|e| RenderError::Resample(e.to_string()))?;
        out.extend_from_slice(&block[0]);
    }

    let mut rounds = 0;
    while out.len() < wanted && rounds < MAX_FLUSH_ROUNDS {
        let block = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| RenderError::Resample(e.to_string()))?;
        if block[0].is_empty() {
            break;
        }
        out.extend_from_slice(&block[0]);
        rounds += 1;
    }

    out.drain(..delay.min(out.len()));
    out.resize(expected_frames, 0.0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_passthrough() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_mono(&input, 44100, 44100, 3).unwrap(), input);
    }

    #[test]
    fn test_downsample_hits_expected_length() {
        let input = vec![0.25f32; 44100];
        let out = resample_mono(&input, 44100, 22050, 22050).unwrap();
        assert_eq!(out.len(), 22050);
    }

    #[test]
    fn test_upsample_preserves_dc_level() {
        let input = vec![0.5f32; 8000];
        let out = resample_mono(&input, 8000, 16000, 16000).unwrap();
        assert_eq!(out.len(), 16000);
        // Middle of the signal, away from edge effects.
        let mid = &out[4000..12000];
        assert!(mid.iter().all(|s| (s - 0.5).abs() < 0.02));
    }
}
