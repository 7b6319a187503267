//! Beat CLI: tempo detection for WAV files.
//!
//! Decodes a WAV file, hands the requested window to a worker process through
//! `beat-broker`, and reports the estimate.

pub mod report;
pub mod wav;

use beat_broker::{CallArgs, TempoSettings};

/// Build the call shape for the given optional window and tempo bounds.
///
/// A duration without an offset starts at the beginning of the file.
pub fn call_args(
    offset: Option<f64>,
    duration: Option<f64>,
    min_tempo: Option<f64>,
    max_tempo: Option<f64>,
) -> CallArgs {
    let args = match (offset, duration) {
        (None, None) => CallArgs::Whole,
        (Some(offset), None) => CallArgs::Offset(offset),
        (offset, Some(duration)) => CallArgs::OffsetDuration(offset.unwrap_or(0.0), duration),
    };

    if min_tempo.is_none() && max_tempo.is_none() {
        return args;
    }

    args.with_settings(TempoSettings {
        min_tempo,
        max_tempo,
        ..TempoSettings::default()
    })
}
