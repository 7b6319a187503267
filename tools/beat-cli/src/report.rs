//! Result rendering for the terminal.

use beat_broker::Guess;
use serde::Serialize;

/// Outcome of one CLI invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Report {
    Analyze { bpm: f64 },
    Guess { bpm: f64, offset: f64 },
}

impl From<Guess> for Report {
    fn from(guess: Guess) -> Self {
        Report::Guess {
            bpm: guess.bpm,
            offset: guess.offset,
        }
    }
}

impl Report {
    /// Human-readable line.
    pub fn to_text(&self) -> String {
        match self {
            Report::Analyze { bpm } => format!("{bpm:.2} BPM"),
            Report::Guess { bpm, offset } => format!("{bpm:.2} BPM, first beat at {offset:.3}s"),
        }
    }

    /// Single-line JSON object.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
