//! Tempo tuning parameters forwarded to the worker.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Optional tuning parameters for the tempo search.
///
/// The broker never interprets these; they are passed through verbatim. The
/// two bounds the worker family understands are typed when numeric. Anything
/// else, including a bound given as `null`, lands in `extra` and is re-emitted
/// unchanged. A bound of any other type is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Map<String, Value>")]
pub struct TempoSettings {
    /// Lower bound of the tempo search range (BPM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tempo: Option<f64>,
    /// Upper bound of the tempo search range (BPM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tempo: Option<f64>,
    /// Keys this crate does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TempoSettings {
    /// Settings constraining the tempo search to `[min, max]` BPM.
    #[must_use]
    pub fn range(min_tempo: f64, max_tempo: f64) -> Self {
        Self {
            min_tempo: Some(min_tempo),
            max_tempo: Some(max_tempo),
            extra: Map::new(),
        }
    }

    /// Attach an arbitrary pass-through key.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl TryFrom<Map<String, Value>> for TempoSettings {
    type Error = String;

    fn try_from(mut extra: Map<String, Value>) -> Result<Self, Self::Error> {
        let min_tempo = take_bound(&mut extra, "minTempo")?;
        let max_tempo = take_bound(&mut extra, "maxTempo")?;
        Ok(Self {
            min_tempo,
            max_tempo,
            extra,
        })
    }
}

/// Move a numeric bound out of `map`. `null` stays behind untouched.
fn take_bound(map: &mut Map<String, Value>, key: &str) -> Result<Option<f64>, String> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let bound = n.as_f64();
            map.remove(key);
            Ok(bound)
        }
        Some(other) => Err(format!("{key} must be a number or null, got {other}")),
    }
}
