//! Request and response envelopes.

use crate::ids::RequestId;
use crate::settings::TempoSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Remote operation a request invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Estimate the tempo of the signal.
    Analyze,
    /// Estimate the tempo and the offset of the first beat.
    Guess,
}

impl Method {
    /// Wire name of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Analyze => "analyze",
            Method::Guess => "guess",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a request: the rendered signal plus optional tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    /// Mono PCM samples. Owned by the message once built.
    pub channel_data: Vec<f32>,
    /// Sample rate of `channel_data` in Hz.
    pub sample_rate: u32,
    /// Present on the wire only when the caller supplied settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_settings: Option<TempoSettings>,
}

/// Request sent to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Correlation id for response matching.
    pub id: RequestId,
    /// Operation to run.
    pub method: Method,
    /// Signal and settings.
    pub params: RequestParams,
}

impl WorkerRequest {
    /// Build a request, taking ownership of the sample buffer.
    #[must_use]
    pub fn new(
        id: RequestId,
        method: Method,
        channel_data: Vec<f32>,
        sample_rate: u32,
        tempo_settings: Option<TempoSettings>,
    ) -> Self {
        Self {
            id,
            method,
            params: RequestParams {
                channel_data,
                sample_rate,
                tempo_settings,
            },
        }
    }

    /// Number of samples carried by this request.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.params.channel_data.len()
    }
}

/// Error body reported by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerError {
    /// Human-readable failure description.
    pub message: String,
}

/// Response received from the worker.
///
/// `error` is `null` on success, in which case `result` holds the
/// method-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    /// Id of the request this answers.
    pub id: RequestId,
    /// Failure reported by the worker.
    #[serde(default)]
    pub error: Option<WorkerError>,
    /// Method-specific success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl WorkerResponse {
    /// A successful response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            error: None,
            result: Some(result),
        }
    }

    /// A failed response.
    #[must_use]
    pub fn failure(id: RequestId, message: impl Into<String>) -> Self {
        Self {
            id,
            error: Some(WorkerError {
                message: message.into(),
            }),
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(raw: u64) -> RequestId {
        RequestId::new(raw).unwrap()
    }

    #[test]
    fn test_request_omits_missing_settings() {
        let request = WorkerRequest::new(id(7), Method::Analyze, vec![0.5, -0.5], 44100, None);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "id": 7,
                "method": "analyze",
                "params": { "channelData": [0.5, -0.5], "sampleRate": 44100 }
            })
        );
        assert!(value["params"].get("tempoSettings").is_none());
    }

    #[test]
    fn test_request_includes_supplied_settings() {
        let settings = TempoSettings::range(80.0, 160.0);
        let request = WorkerRequest::new(id(9), Method::Guess, vec![], 48000, Some(settings));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["method"], json!("guess"));
        assert_eq!(
            value["params"]["tempoSettings"],
            json!({ "minTempo": 80.0, "maxTempo": 160.0 })
        );
    }

    #[test]
    fn test_response_with_null_error() {
        let response: WorkerResponse =
            serde_json::from_value(json!({ "id": 3, "error": null, "result": 128.0 })).unwrap();

        assert_eq!(response.id, id(3));
        assert!(response.error.is_none());
        assert_eq!(response.result, Some(json!(128.0)));
    }

    #[test]
    fn test_response_with_error_and_no_result() {
        let response: WorkerResponse =
            serde_json::from_value(json!({ "id": 4, "error": { "message": "boom" } })).unwrap();

        assert_eq!(response.error.unwrap().message, "boom");
        assert!(response.result.is_none());
    }

    #[test]
    fn test_failure_serializes_error_object() {
        let value = serde_json::to_value(WorkerResponse::failure(id(5), "boom")).unwrap();
        assert_eq!(value, json!({ "id": 5, "error": { "message": "boom" } }));
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Analyze.to_string(), "analyze");
        assert_eq!(Method::Guess.as_str(), "guess");
    }
}
