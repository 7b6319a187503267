//! # Error Types
//!
//! Failures raised while building or decoding protocol messages.

use thiserror::Error;

/// Errors from protocol encoding and decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// Id does not fit in a JSON-safe integer.
    #[error("Request id {0} exceeds 2^53 - 1")]
    IdOutOfRange(u64),

    /// A successful response carried no `result`.
    #[error("Response carries neither error nor result")]
    MissingResult,

    /// The `result` payload had the wrong shape for the method.
    #[error("Malformed {method} result: {reason}")]
    MalformedResult {
        method: &'static str,
        reason: String,
    },
}
