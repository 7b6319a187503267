//! Broker error types.
//!
//! Every failure is delivered to exactly the caller whose request produced it.

use crate::ipc::handler::TransportError;
use beat_protocol::{Method, ProtocolError};

/// Errors raised while extracting and filtering the analysis window.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// Offset/duration negative, non-finite, or past the end of the source.
    #[error(
        "invalid window: offset {offset}s + duration {duration}s exceeds source duration {source_duration}s or is negative"
    )]
    InvalidWindow {
        offset: f64,
        duration: f64,
        source_duration: f64,
    },

    /// Source buffer is unusable (no channels, ragged channels, zero rate).
    #[error("invalid audio buffer: {0}")]
    InvalidBuffer(String),

    /// Filter coefficients could not be built.
    #[error("filter error: {0}")]
    Filter(String),

    /// Resampler construction or processing failed.
    #[error("resample error: {0}")]
    Resample(String),

    /// The blocking render task panicked or was cancelled.
    #[error("render task failed: {0}")]
    Task(String),
}

/// Errors surfaced by [`BeatDetector`](crate::BeatDetector) calls.
#[derive(Debug, thiserror::Error)]
pub enum BeatDetectorError {
    /// Window extraction failed; nothing was sent.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The worker reported a failure. Displays the worker's message verbatim.
    #[error("{message}")]
    Remote { message: String },

    /// The request could not be handed to the transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The inbound stream closed before a response arrived.
    #[error("worker disconnected before responding")]
    Disconnected,

    /// Broker configuration rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The worker answered with a result of the wrong shape.
    #[error("unexpected {method} result: {reason}")]
    UnexpectedResult { method: Method, reason: String },
}

impl BeatDetectorError {
    pub(crate) fn unexpected(method: Method, error: ProtocolError) -> Self {
        Self::UnexpectedResult {
            method,
            reason: error.to_string(),
        }
    }

    /// True when the failure was reported by the worker itself.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BeatDetectorError>;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid low-pass cutoff: {0}")]
    InvalidCutoff(String),

    #[error("invalid target sample rate: {0}")]
    InvalidSampleRate(String),

    #[error("invalid channel capacity: {0}")]
    InvalidCapacity(String),

    #[error("worker program not configured")]
    MissingWorkerProgram,

    #[error("unknown channel selection: {0} (expected first or mixdown)")]
    InvalidChannel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_displays_message_verbatim() {
        let err = BeatDetectorError::Remote {
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "boom");
        assert!(err.is_remote());
    }

    #[test]
    fn test_render_error_is_transparent() {
        let render = RenderError::InvalidBuffer("no channels".into());
        let err: BeatDetectorError = render.clone().into();
        assert_eq!(err.to_string(), render.to_string());
        assert!(!err.is_remote());
    }

    #[test]
    fn test_unexpected_result_names_method() {
        let err = BeatDetectorError::unexpected(Method::Guess, ProtocolError::MissingResult);
        assert!(err.to_string().starts_with("unexpected guess result"));
    }
}
