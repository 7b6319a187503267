//! Call argument shapes for `analyze` and `guess`.
//!
//! Each legal overload is one variant; [`CallArgs::resolve`] turns any of them
//! into a canonical [`ResolvedCall`] once, at the call boundary.
//!
//! ```ignore
//! detector.analyze(&buffer, ()).await?;                          // whole buffer
//! detector.analyze(&buffer, 1.5).await?;                         // from 1.5s
//! detector.analyze(&buffer, settings.clone()).await?;            // whole buffer, tuned
//! detector.analyze(&buffer, (1.5, 10.0)).await?;                 // 10s from 1.5s
//! detector.analyze(&buffer, (1.5, settings.clone())).await?;     // from 1.5s, tuned
//! detector.analyze(&buffer, (1.5, 10.0, settings)).await?;       // 10s from 1.5s, tuned
//! ```

use beat_protocol::TempoSettings;

/// The argument shapes accepted after the audio buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CallArgs {
    /// Whole buffer, no settings.
    #[default]
    Whole,
    /// From `offset` seconds to the end.
    Offset(f64),
    /// Whole buffer with settings.
    Settings(TempoSettings),
    /// `duration` seconds starting at `offset`.
    OffsetDuration(f64, f64),
    /// From `offset` seconds to the end, with settings.
    OffsetSettings(f64, TempoSettings),
    /// `duration` seconds starting at `offset`, with settings.
    OffsetDurationSettings(f64, f64, TempoSettings),
}

/// Canonical window and settings for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    /// Window start in seconds.
    pub offset: f64,
    /// Window length in seconds.
    pub duration: f64,
    /// Settings to forward, if any.
    pub tempo_settings: Option<TempoSettings>,
}

impl CallArgs {
    /// Fill in defaults: offset `0`, duration running to the end of the source.
    #[must_use]
    pub fn resolve(self, source_duration: f64) -> ResolvedCall {
        let (offset, duration, tempo_settings) = match self {
            CallArgs::Whole => (0.0, None, None),
            CallArgs::Offset(offset) => (offset, None, None),
            CallArgs::Settings(settings) => (0.0, None, Some(settings)),
            CallArgs::OffsetDuration(offset, duration) => (offset, Some(duration), None),
            CallArgs::OffsetSettings(offset, settings) => (offset, None, Some(settings)),
            CallArgs::OffsetDurationSettings(offset, duration, settings) => {
                (offset, Some(duration), Some(settings))
            }
        };

        ResolvedCall {
            offset,
            duration: duration.unwrap_or(source_duration - offset),
            tempo_settings,
        }
    }

    /// Attach settings, keeping whatever window was already given.
    #[must_use]
    pub fn with_settings(self, settings: TempoSettings) -> Self {
        match self {
            CallArgs::Whole | CallArgs::Settings(_) => CallArgs::Settings(settings),
            CallArgs::Offset(o) | CallArgs::OffsetSettings(o, _) => {
                CallArgs::OffsetSettings(o, settings)
            }
            CallArgs::OffsetDuration(o, d) | CallArgs::OffsetDurationSettings(o, d, _) => {
                CallArgs::OffsetDurationSettings(o, d, settings)
            }
        }
    }
}

impl From<()> for CallArgs {
    fn from(_: ()) -> Self {
        CallArgs::Whole
    }
}

impl From<f64> for CallArgs {
    fn from(offset: f64) -> Self {
        CallArgs::Offset(offset)
    }
}

impl From<TempoSettings> for CallArgs {
    fn from(settings: TempoSettings) -> Self {
        CallArgs::Settings(settings)
    }
}

impl From<(f64, f64)> for CallArgs {
    fn from((offset, duration): (f64, f64)) -> Self {
        CallArgs::OffsetDuration(offset, duration)
    }
}

impl From<(f64, TempoSettings)> for CallArgs {
    fn from((offset, settings): (f64, TempoSettings)) -> Self {
        CallArgs::OffsetSettings(offset, settings)
    }
}

impl From<(f64, f64, TempoSettings)> for CallArgs {
    fn from((offset, duration, settings): (f64, f64, TempoSettings)) -> Self {
        CallArgs::OffsetDurationSettings(offset, duration, settings)
    }
}
