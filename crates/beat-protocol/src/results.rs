//! Method-specific result payloads.

use crate::errors::ProtocolError;
use crate::messages::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a `guess` request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    /// Estimated tempo in BPM.
    pub bpm: f64,
    /// Position of the first detected beat, in seconds.
    pub offset: f64,
}

/// `analyze` results arrive either as a bare number or as `{ "tempo": n }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnalyzeResult {
    Bare(f64),
    Wrapped { tempo: f64 },
}

/// Decode the tempo carried by an `analyze` response.
pub fn decode_analyze(result: Option<Value>) -> Result<f64, ProtocolError> {
    let value = result.ok_or(ProtocolError::MissingResult)?;
    match serde_json::from_value(value) {
        Ok(AnalyzeResult::Bare(tempo)) | Ok(AnalyzeResult::Wrapped { tempo }) => Ok(tempo),
        Err(e) => Err(ProtocolError::MalformedResult {
            method: Method::Analyze.as_str(),
            reason: e.to_string(),
        }),
    }
}

/// Decode the `{ bpm, offset }` pair carried by a `guess` response.
pub fn decode_guess(result: Option<Value>) -> Result<Guess, ProtocolError> {
    let value = result.ok_or(ProtocolError::MissingResult)?;
    serde_json::from_value(value).map_err(|e| ProtocolError::MalformedResult {
        method: Method::Guess.as_str(),
        reason: e.to_string(),
    })
}
